//! Thin wrappers around the system `git` command.
//!
//! Using the system binary picks up whatever authentication the user already
//! has configured:
//! - SSH keys from ~/.ssh/
//! - Git credential helpers
//! - Personal access tokens
//! - Any authentication configured in ~/.gitconfig

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use crate::config::VersionSelector;
use crate::error::Error;

/// Clone a repository with all of its submodules.
///
/// When the selector names a tag or branch, that ref is checked out;
/// otherwise the remote's default branch is.
pub fn clone_recursive(
    url: &str,
    selector: &VersionSelector,
    target_dir: &Path,
) -> Result<(), Error> {
    // Create parent directory if it doesn't exist
    if let Some(parent) = target_dir.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut cmd = git();
    cmd.args(["clone", "--recursive", "--quiet"]);
    if let Some(ref_name) = selector.ref_name() {
        cmd.args(["--branch", ref_name]);
    }
    cmd.arg(url).arg(target_dir);

    let ref_label = selector.ref_name().unwrap_or("HEAD").to_string();
    let output = cmd.output().map_err(|e| Error::GitClone {
        url: url.to_string(),
        r#ref: ref_label.clone(),
        message: e.to_string(),
        hint: Some("Make sure git is installed and on PATH".to_string()),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        // Provide helpful error message for common auth failures
        let hint = if stderr.contains("Authentication failed")
            || stderr.contains("Permission denied")
            || stderr.contains("Could not read from remote repository")
        {
            Some(
                "For private repos, ensure you have an SSH key added to ssh-agent, \
                 git credentials configured, or a personal access token set up"
                    .to_string(),
            )
        } else if stderr.contains("not found in upstream") {
            Some(format!("Check that '{}' exists in the repository", ref_label))
        } else {
            None
        };

        return Err(Error::GitClone {
            url: url.to_string(),
            r#ref: ref_label,
            message: stderr,
            hint,
        });
    }

    Ok(())
}

/// Bring an existing clone up to date with the selected ref.
///
/// Fetches branches and tags, force-checks-out the selector (the remote
/// branch head, the tag, or the remote default branch), then initializes and
/// updates submodules recursively.
pub fn update_clone(repo_dir: &Path, selector: &VersionSelector) -> Result<(), Error> {
    run_in(repo_dir, &["fetch", "--tags", "--force", "--quiet", "origin"])?;

    match selector {
        VersionSelector::Branch(branch) => {
            let remote = format!("refs/remotes/origin/{}", branch);
            run_in(
                repo_dir,
                &["checkout", "--force", "--quiet", "-B", branch, &remote],
            )?;
        }
        VersionSelector::Tag(tag) => {
            let tag_ref = format!("refs/tags/{}", tag);
            run_in(
                repo_dir,
                &["checkout", "--force", "--quiet", "--detach", &tag_ref],
            )?;
        }
        VersionSelector::Default => {
            run_in(repo_dir, &["remote", "set-head", "origin", "--auto"])?;
            run_in(
                repo_dir,
                &[
                    "checkout",
                    "--force",
                    "--quiet",
                    "--detach",
                    "refs/remotes/origin/HEAD",
                ],
            )?;
        }
    }

    run_in(repo_dir, &["submodule", "sync", "--recursive", "--quiet"])?;
    run_in(
        repo_dir,
        &["submodule", "update", "--init", "--recursive", "--quiet"],
    )?;

    Ok(())
}

fn git() -> Command {
    let mut cmd = Command::new("git");
    // Never block on an interactive credential prompt
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    cmd
}

fn run_in(repo_dir: &Path, args: &[&str]) -> Result<Output, Error> {
    let command = format!("git {}", args.join(" "));
    let output = git()
        .current_dir(repo_dir)
        .args(args)
        .output()
        .map_err(|e| Error::GitCommand {
            command: command.clone(),
            path: repo_dir.to_path_buf(),
            stderr: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(Error::GitCommand {
            command,
            path: repo_dir.to_path_buf(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output)
}
