use std::fs;
use std::path::{Path, PathBuf};

/// Only the ledger applier may write ratings, stats, coins or the house balance
const ALLOWED_LEDGER_WRITERS: &[&str] = &["src/ledger.rs"];

const LEDGER_WRITES: &[&str] = &[
    ".update_participant(",
    ".update_team(",
    ".update_house(",
    ".insert_ledger_entry(",
    ".mark_applied(",
];

fn collect_rust_files(root: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(root) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_rust_files(&path, out);
            continue;
        }
        if path.extension().and_then(|s| s.to_str()) == Some("rs") {
            out.push(path);
        }
    }
}

#[test]
fn ledger_writes_are_limited_to_the_applier() {
    let repo_root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let src_root = repo_root.join("src");
    let mut files = Vec::new();
    collect_rust_files(&src_root, &mut files);

    let mut offenders = Vec::new();
    for file in files {
        let rel = file
            .strip_prefix(repo_root)
            .unwrap_or(&file)
            .to_string_lossy()
            .replace('\\', "/");
        // Backends implement the writes; they don't call them
        if rel.starts_with("src/persistence/") || ALLOWED_LEDGER_WRITERS.contains(&rel.as_str()) {
            continue;
        }
        let content = fs::read_to_string(&file).unwrap_or_default();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if LEDGER_WRITES.iter().any(|call| trimmed.contains(call)) {
                offenders.push(format!("{rel}:{}: {}", idx + 1, trimmed));
            }
        }
    }

    assert!(
        offenders.is_empty(),
        "ledger write path detected outside the applier:\n{}",
        offenders.join("\n")
    );
}

#[test]
fn proposals_reach_applied_only_through_a_ledger_commit() {
    let repo_root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut files = Vec::new();
    collect_rust_files(&repo_root.join("src"), &mut files);

    let mut offenders = Vec::new();
    for file in files {
        let content = fs::read_to_string(&file).unwrap_or_default();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.starts_with("//") {
                continue;
            }
            // transition_proposal(id, from, ProposalStatus::Applied, ...) on one line
            if trimmed.contains("transition_proposal(") && trimmed.contains("ProposalStatus::Applied")
            {
                offenders.push(format!("{}:{}: {}", file.display(), idx + 1, trimmed));
            }
        }
    }

    assert!(
        offenders.is_empty(),
        "manual transition to Applied detected:\n{}",
        offenders.join("\n")
    );
}
