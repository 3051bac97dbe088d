use std::path::{Path, PathBuf};

#[derive(Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub llm: LlmConfig,
}

#[derive(Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub uploads_dir: PathBuf,
}

#[derive(Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl StorageConfig {
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("database.json")
    }

    pub fn lessons_dir(&self) -> PathBuf {
        self.uploads_dir.join("lessons")
    }

    pub fn handouts_dir(&self) -> PathBuf {
        self.lessons_dir().join("handouts")
    }

    pub fn slide_decks_dir(&self) -> PathBuf {
        self.lessons_dir().join("slidedecks")
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.lessons_dir().join("videos")
    }

    pub fn courses_dir(&self) -> PathBuf {
        self.uploads_dir.join("courses")
    }

    pub fn assessments_dir(&self) -> PathBuf {
        self.uploads_dir.join("assessments")
    }

    /// Maps a public `/uploads/...` reference back to its on-disk path.
    pub fn resolve_upload(&self, reference: &str) -> Option<PathBuf> {
        let rest = reference.strip_prefix("/uploads/")?;
        if rest.is_empty() || Path::new(rest).components().any(|c| {
            matches!(c, std::path::Component::ParentDir | std::path::Component::RootDir)
        }) {
            return None;
        }
        Some(self.uploads_dir.join(rest))
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let server = ServerConfig {
            host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
        };
        let storage = StorageConfig {
            data_dir: std::env::var("DATA_DIR")
                .unwrap_or_else(|_| "./db".to_string())
                .into(),
            uploads_dir: std::env::var("UPLOADS_DIR")
                .unwrap_or_else(|_| "./uploads".to_string())
                .into(),
        };
        let llm = LlmConfig {
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
        };
        Ok(AppConfig {
            server,
            storage,
            llm,
        })
    }

    /// Creates the data and uploads tree. Runs once at startup, before any
    /// handler touches the filesystem.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for dir in [
            self.storage.data_dir.clone(),
            self.storage.uploads_dir.clone(),
            self.storage.lessons_dir(),
            self.storage.handouts_dir(),
            self.storage.slide_decks_dir(),
            self.storage.videos_dir(),
            self.storage.courses_dir(),
            self.storage.assessments_dir(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}
