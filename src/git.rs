use crate::models::{BlameInfo, DebtItem};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate};
use git2::{BlameOptions, Repository};
use log::debug;
use std::path::Path;

/// Get git repository for a given path
pub fn get_repository(path: &Path) -> Option<Repository> {
    Repository::discover(path).ok()
}

/// Get git blame information for a specific line in a file
pub fn blame_line(
    repo: &Repository,
    file_path: &Path,
    line_number: usize,
    today: NaiveDate,
) -> Result<Option<BlameInfo>> {
    let workdir = repo
        .workdir()
        .context("Repository has no working directory")?
        .canonicalize()
        .context("Failed to resolve repository working directory")?;
    let absolute = file_path
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", file_path.display()))?;
    let Ok(relative_path) = absolute.strip_prefix(&workdir) else {
        return Ok(None);
    };

    let mut opts = BlameOptions::new();
    opts.track_copies_same_file(true)
        .track_copies_same_commit_moves(true)
        .track_copies_same_commit_copies(true);

    // Untracked files have no blame
    let Ok(blame) = repo.blame_file(relative_path, Some(&mut opts)) else {
        return Ok(None);
    };

    // 1-indexed, like line_number
    let Some(hunk) = blame.get_line(line_number) else {
        return Ok(None);
    };

    let commit_id = hunk.final_commit_id();
    let commit = repo.find_commit(commit_id)?;

    let author = commit.author();
    let author_name = author.name().unwrap_or("Unknown").to_string();
    let author_email = author.email().unwrap_or("unknown@example.com").to_string();

    let commit_time = DateTime::from_timestamp(commit.time().seconds(), 0)
        .context("Commit time out of range")?;
    let age_days = (today - commit_time.date_naive()).num_days().max(0);

    Ok(Some(BlameInfo {
        author: author_name,
        author_email,
        commit_hash: format!("{:.7}", commit_id),
        commit_time,
        age_days,
    }))
}

/// Attach blame to every item whose file is tracked under `root`'s repository.
///
/// Items are root-relative. Anything that cannot be blamed keeps `blame = None`.
pub fn enrich_items(root: &Path, items: &mut [DebtItem], today: NaiveDate) {
    let Some(repo) = get_repository(root) else {
        debug!("{} is not inside a git repository, skipping blame", root.display());
        return;
    };

    for item in items.iter_mut() {
        let path = root.join(&item.file_path);
        item.blame = match blame_line(&repo, &path, item.line_number, today) {
            Ok(info) => info,
            Err(err) => {
                debug!("No blame for {}:{}: {:#}", item.file_path.display(), item.line_number, err);
                None
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::{date, item};
    use git2::Signature;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_repo() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path()).unwrap();

        fs::write(
            temp_dir.path().join("test.rs"),
            "// First line\n// @debtbomb(expire=2020-01-01)\nfn main() {}\n",
        )
        .unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new("test.rs")).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();

        let signature = Signature::now("Test User", "test@example.com").unwrap();
        repo.commit(Some("HEAD"), &signature, &signature, "Initial commit", &tree, &[])
            .unwrap();

        temp_dir
    }

    #[test]
    fn test_get_repository() {
        let temp_dir = create_test_repo();
        assert!(get_repository(temp_dir.path()).is_some());
    }

    #[test]
    fn test_blame_line() {
        let temp_dir = create_test_repo();
        let repo = Repository::open(temp_dir.path()).unwrap();
        let file_path = temp_dir.path().join("test.rs");
        let today = chrono::Local::now().date_naive();

        let info = blame_line(&repo, &file_path, 2, today).unwrap().unwrap();
        assert_eq!(info.author, "Test User");
        assert_eq!(info.author_email, "test@example.com");
        assert_eq!(info.commit_hash.len(), 7);
        assert!(info.age_days <= 1);

        assert!(blame_line(&repo, &file_path, 99, today).unwrap().is_none());
    }

    #[test]
    fn test_enrich_items() {
        let temp_dir = create_test_repo();
        fs::write(temp_dir.path().join("untracked.rs"), "// new\n").unwrap();

        let mut items = vec![item("test.rs", 2, "2020-01-01"), item("untracked.rs", 1, "2020-01-01")];
        enrich_items(temp_dir.path(), &mut items, chrono::Local::now().date_naive());

        assert_eq!(items[0].blame.as_ref().map(|b| b.author.as_str()), Some("Test User"));
        assert!(items[1].blame.is_none());
    }

    #[test]
    fn test_enrich_outside_repository_is_silent() {
        let temp_dir = TempDir::new().unwrap();
        let mut items = vec![item("a.rs", 1, "2020-01-01")];
        enrich_items(temp_dir.path(), &mut items, date("2025-01-01"));
        assert!(items[0].blame.is_none());
    }
}
