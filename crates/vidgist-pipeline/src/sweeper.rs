//! Periodic removal of stale temp files.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use vidgist_core::{SweepStats, Workspace};

/// Run one sweep on the blocking pool.
pub async fn sweep_once(workspace: &Workspace, max_age: Duration) -> SweepStats {
    let workspace = workspace.clone();
    match tokio::task::spawn_blocking(move || workspace.sweep(max_age)).await {
        Ok(stats) => stats,
        Err(e) => {
            warn!("Sweep task failed: {}", e);
            SweepStats::default()
        }
    }
}

/// Start a background task that sweeps `workspace` every `every`.
///
/// The first sweep runs immediately. Returns `None` when `max_age` is zero,
/// since temp files are then deleted as soon as each request finishes.
pub fn spawn_sweeper(
    workspace: Workspace,
    every: Duration,
    max_age: Duration,
) -> Option<JoinHandle<()>> {
    if max_age.is_zero() {
        debug!("Temp files are deleted immediately, no sweeper needed");
        return None;
    }

    let every = every.max(Duration::from_secs(1));
    info!(
        "Temp sweeper started (every {}s, keeping files younger than {}s)",
        every.as_secs(),
        max_age.as_secs()
    );

    Some(tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let stats = sweep_once(&workspace, max_age).await;
            if stats.files_deleted + stats.dirs_deleted > 0 || stats.errors > 0 {
                info!(
                    "Sweep removed {} files and {} frame directories ({} errors)",
                    stats.files_deleted, stats.dirs_deleted, stats.errors
                );
            } else {
                debug!("Sweep found nothing to remove");
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixture, temp_entries};

    #[tokio::test]
    async fn test_zero_age_disables_sweeper() {
        let (_dir, workspace) = fixture();
        assert!(spawn_sweeper(workspace, Duration::from_secs(60), Duration::ZERO).is_none());
    }

    #[tokio::test]
    async fn test_sweep_once_removes_old_entries() {
        let (_dir, workspace) = fixture();
        std::fs::write(workspace.new_video_path(), b"video").unwrap();
        let frames = workspace.new_frames_dir().unwrap();
        std::fs::write(frames.join("frame_001.jpg"), b"jpeg").unwrap();
        std::fs::write(workspace.videos_dir().join("keep.txt"), b"not ours").unwrap();

        let stats = sweep_once(&workspace, Duration::from_secs(3600)).await;
        assert_eq!(stats, SweepStats::default());
        assert_eq!(temp_entries(&workspace), 3);

        std::thread::sleep(Duration::from_millis(20));
        let stats = sweep_once(&workspace, Duration::from_millis(5)).await;
        assert_eq!(stats.files_deleted, 1);
        assert_eq!(stats.dirs_deleted, 1);
        assert_eq!(temp_entries(&workspace), 1);
    }

    #[tokio::test]
    async fn test_background_sweeper_runs() {
        let (_dir, workspace) = fixture();
        let video = workspace.new_video_path();
        std::fs::write(&video, b"video").unwrap();
        std::thread::sleep(Duration::from_millis(20));

        let handle = spawn_sweeper(
            workspace.clone(),
            Duration::from_secs(3600),
            Duration::from_millis(5),
        )
        .unwrap();

        for _ in 0..100 {
            if !video.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        handle.abort();
        assert!(!video.exists());
    }
}
