use crate::prelude::DB;
use std::sync::Weak;
use tempfile::TempDir;

/// Keeps a temporary DB directory alive for as long as the DB itself is referenced.
/// On drop, the directory is deleted once the last DB reference is gone.
pub struct DbLifetime {
    weak_db_ref: Weak<DB>,
    optional_tempdir: Option<TempDir>,
}

impl DbLifetime {
    pub fn new(tempdir: TempDir, weak_db_ref: Weak<DB>) -> Self {
        Self { optional_tempdir: Some(tempdir), weak_db_ref }
    }
}

impl Drop for DbLifetime {
    fn drop(&mut self) {
        for _ in 0..16 {
            if self.weak_db_ref.strong_count() > 0 {
                // Sometimes another thread is shutting-down and cleaning resources
                std::thread::sleep(std::time::Duration::from_millis(1000));
            } else {
                break;
            }
        }
        assert_eq!(self.weak_db_ref.strong_count(), 0, "DB is expected to have no strong references when lifetime is dropped");
        if let Some(dir) = self.optional_tempdir.take() {
            let options = rocksdb::Options::default();
            let path_buf = dir.path().to_owned();
            DB::destroy(&options, &path_buf).expect("DB is expected to be deletable since there are no references to it");
        }
    }
}

pub fn get_nestedset_tempdir() -> std::io::Result<TempDir> {
    let global_tempdir = std::env::temp_dir();
    let nestedset_tempdir = global_tempdir.join("nestedset");
    std::fs::create_dir_all(nestedset_tempdir.as_path())?;
    tempfile::tempdir_in(nestedset_tempdir.as_path())
}

/// Creates a DB within a temp directory under `<OS SPECIFIC TEMP DIR>/nestedset`
/// Callers must keep the `DbLifetime` guard for as long as they wish the DB to exist.
#[macro_export]
macro_rules! create_temp_db {
    ($conn_builder: expr) => {{
        let db_tempdir = $crate::utils::get_nestedset_tempdir().expect("temp dir is expected to be creatable");
        let db_path = db_tempdir.path().to_owned();
        let db = $conn_builder.with_db_path(db_path).build().expect("temp DB is expected to open");
        ($crate::utils::DbLifetime::new(db_tempdir, std::sync::Arc::downgrade(&db)), db)
    }};
}
