use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use actix_web::web::Bytes;
use futures::{Stream, StreamExt};
use mongodb::bson::{oid::ObjectId, DateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::{fs, io::AsyncWriteExt};

use crate::{
    config::Config,
    errors::{AppError, AppResult},
    repositories::UserRepository,
};

pub const PUBLIC_PREFIX: &str = "/uploads";

/// Subdirectory of `upload_dir` holding uploads that are still being written.
const STAGING_DIR: &str = "tmp";

static SAFE_EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]{1,10}$").expect("valid extension pattern"));

/// Metadata of an incoming picture upload.
#[derive(Debug, Clone, Default)]
pub struct PicUpload {
    pub file_name: Option<String>,
    pub content_type: Option<mime::Mime>,
}

impl PicUpload {
    fn check_is_image(&self) -> AppResult<()> {
        match &self.content_type {
            Some(mime) if mime.type_() == mime::IMAGE => Ok(()),
            _ => Err(AppError::ValidationError("Only image files are allowed!".to_string())),
        }
    }

    /// The original extension with its dot, lowercased, or empty when unsafe.
    fn extension(&self) -> String {
        self.file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| SAFE_EXTENSION.is_match(ext))
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default()
    }
}

/// Static mount for stored pictures. Only top-level files are served, so
/// staged uploads under the staging directory are never reachable.
pub fn public_files(upload_dir: &Path) -> actix_files::Files {
    actix_files::Files::new(PUBLIC_PREFIX, upload_dir.to_path_buf())
        .path_filter(|path, _| path.components().count() == 1 && !path.starts_with(STAGING_DIR))
}

/// Stores profile pictures on disk under `upload_dir` and keeps the user's
/// `profilePic` field in step with the file that is actually present.
pub struct ProfilePicStore {
    users: Arc<dyn UserRepository>,
    upload_dir: PathBuf,
    max_bytes: usize,
}

impl ProfilePicStore {
    pub fn new(users: Arc<dyn UserRepository>, config: &Config) -> Self {
        Self {
            users,
            upload_dir: config.upload_dir.clone(),
            max_bytes: config.max_upload_bytes,
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    fn staging_dir(&self) -> PathBuf {
        self.upload_dir.join(STAGING_DIR)
    }

    /// Maps a stored public path such as `/uploads/x.png` back to its file.
    fn file_for(&self, public_path: &str) -> Option<PathBuf> {
        let name = Path::new(public_path).file_name()?;
        Some(self.upload_dir.join(name))
    }

    async fn discard(path: &Path) {
        if let Err(e) = fs::remove_file(path).await {
            log::warn!("Failed to remove {}: {}", path.display(), e);
        }
    }

    async fn stage<S, E>(&self, staged: &Path, mut data: S) -> AppResult<()>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        AppError: From<E>,
    {
        let mut file = fs::File::create(staged).await?;
        let mut written = 0usize;

        while let Some(chunk) = data.next().await {
            let chunk = chunk?;
            written += chunk.len();
            if written > self.max_bytes {
                return Err(AppError::ValidationError(format!(
                    "File too large (max {} bytes)",
                    self.max_bytes
                )));
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        if written == 0 {
            return Err(AppError::ValidationError("No file uploaded".to_string()));
        }
        Ok(())
    }

    /// Saves a new picture for `user_id` and returns its public path.
    ///
    /// The upload is written to a staging file first. The user record is
    /// pointed at the new name before the file is moved into place, and the
    /// record is rolled back if the move fails. The previous picture is
    /// removed only after both steps succeed.
    pub async fn save<S, E>(&self, user_id: &ObjectId, upload: PicUpload, data: S) -> AppResult<String>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        AppError: From<E>,
    {
        upload.check_is_image()?;

        let previous = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?
            .profile_pic;

        let name = format!(
            "{}-{}{}",
            user_id.to_hex(),
            DateTime::now().timestamp_millis(),
            upload.extension()
        );
        let public_path = format!("{}/{}", PUBLIC_PREFIX, name);

        fs::create_dir_all(self.staging_dir()).await?;
        let staged = self.staging_dir().join(&name);

        if let Err(e) = self.stage(&staged, data).await {
            Self::discard(&staged).await;
            return Err(e);
        }

        match self.users.set_profile_pic(user_id, Some(public_path.clone())).await {
            Ok(true) => {}
            Ok(false) => {
                Self::discard(&staged).await;
                return Err(AppError::NotFound("User not found".to_string()));
            }
            Err(e) => {
                Self::discard(&staged).await;
                return Err(e);
            }
        }

        let target = self.upload_dir.join(&name);
        if let Err(e) = fs::rename(&staged, &target).await {
            log::error!("Failed to move {} into place: {}", staged.display(), e);
            if let Err(restore) = self.users.set_profile_pic(user_id, previous).await {
                log::error!("Failed to restore profilePic for {}: {}", user_id.to_hex(), restore);
            }
            Self::discard(&staged).await;
            return Err(e.into());
        }

        if let Some(old) = previous.as_deref().and_then(|p| self.file_for(p)) {
            if old != target {
                if let Err(e) = fs::remove_file(&old).await {
                    log::debug!("Previous picture {} not removed: {}", old.display(), e);
                }
            }
        }

        log::info!("Stored profile picture {} for {}", public_path, user_id.to_hex());
        Ok(public_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::domain::{User, UserRole},
        repositories::user_repository::MockUserRepository,
    };
    use futures::stream;

    fn store(users: MockUserRepository, dir: &Path, max_bytes: usize) -> ProfilePicStore {
        let mut config = Config::test_config();
        config.upload_dir = dir.to_path_buf();
        config.max_upload_bytes = max_bytes;
        ProfilePicStore::new(Arc::new(users), &config)
    }

    fn png_upload() -> PicUpload {
        PicUpload {
            file_name: Some("avatar.PNG".to_string()),
            content_type: Some(mime::IMAGE_PNG),
        }
    }

    fn body(bytes: &'static [u8]) -> impl Stream<Item = Result<Bytes, AppError>> + Unpin {
        stream::iter(vec![Ok(Bytes::from_static(bytes))])
    }

    #[test]
    fn test_extension_is_sanitised() {
        assert_eq!(png_upload().extension(), ".png");

        let odd = PicUpload {
            file_name: Some("x.p/ng$".to_string()),
            content_type: None,
        };
        assert_eq!(odd.extension(), "");
        assert_eq!(PicUpload::default().extension(), "");
    }

    #[tokio::test]
    async fn test_rejects_non_images() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(MockUserRepository::new(), dir.path(), 1024);
        let upload = PicUpload {
            file_name: Some("notes.txt".to_string()),
            content_type: Some(mime::TEXT_PLAIN),
        };

        match store.save(&ObjectId::new(), upload, body(b"hello")).await {
            Err(AppError::ValidationError(msg)) => assert_eq!(msg, "Only image files are allowed!"),
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_save_moves_file_and_removes_previous() {
        let dir = tempfile::tempdir().unwrap();
        let old_file = dir.path().join("old.png");
        std::fs::write(&old_file, b"old").unwrap();

        let mut user = User::new("Kiran", "kiran@example.com", "hash", UserRole::Student);
        user.profile_pic = Some("/uploads/old.png".to_string());
        let id = user.id;

        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));
        users
            .expect_set_profile_pic()
            .withf(|_, path| path.as_deref().is_some_and(|p| p.starts_with("/uploads/") && p.ends_with(".png")))
            .times(1)
            .returning(|_, _| Ok(true));

        let store = store(users, dir.path(), 1024);
        let public = store.save(&id, png_upload(), body(b"\x89PNG")).await.unwrap();

        let name = public.trim_start_matches("/uploads/");
        assert!(name.starts_with(&id.to_hex()));
        assert_eq!(std::fs::read(dir.path().join(name)).unwrap(), b"\x89PNG");
        assert!(!dir.path().join("tmp").join(name).exists());
        assert!(!old_file.exists());
    }

    #[tokio::test]
    async fn test_failed_record_update_discards_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let user = User::new("Kiran", "kiran@example.com", "hash", UserRole::Student);
        let id = user.id;

        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));
        users
            .expect_set_profile_pic()
            .returning(|_, _| Err(AppError::DatabaseError("write failed".to_string())));

        let store = store(users, dir.path(), 1024);
        assert!(store.save(&id, png_upload(), body(b"img")).await.is_err());

        let staged: Vec<_> = std::fs::read_dir(dir.path().join("tmp")).unwrap().collect();
        assert!(staged.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let user = User::new("Kiran", "kiran@example.com", "hash", UserRole::Student);
        let id = user.id;

        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));
        users.expect_set_profile_pic().never();

        let store = store(users, dir.path(), 4);
        let result = store.save(&id, png_upload(), body(b"too many bytes")).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }
}
