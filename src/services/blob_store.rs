// src/services/blob_store.rs

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::common::error::AppError;

/// Prefixo público das URLs devolvidas pelo armazenamento local.
pub const UPLOADS_URL_PREFIX: &str = "/_uploads/";

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Grava os bytes e devolve a URL pública. Só retorna depois que o
    /// arquivo foi escrito e fechado.
    async fn store(&self, bytes: &[u8], extension: &str) -> Result<String, AppError>;

    /// Remove o arquivo da URL. Arquivo inexistente não é erro.
    async fn delete(&self, url: &str) -> Result<(), AppError>;
}

#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Caminho no disco para uma URL gerada por este store. URLs de fora
    /// (ou com `..`) não são aceitas.
    pub fn path_for(&self, url: &str) -> Option<PathBuf> {
        let file_name = url.strip_prefix(UPLOADS_URL_PREFIX)?;
        let valid = !file_name.is_empty()
            && file_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
            && !file_name.contains("..");
        valid.then(|| self.root.join(file_name))
    }
}

fn sanitize_extension(extension: &str) -> String {
    let ext: String = extension
        .trim_start_matches('.')
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(10)
        .collect::<String>()
        .to_ascii_lowercase();
    if ext.is_empty() { "bin".to_string() } else { ext }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn store(&self, bytes: &[u8], extension: &str) -> Result<String, AppError> {
        let storage_error = |e: std::io::Error| AppError::StorageError(e.to_string());

        tokio::fs::create_dir_all(&self.root).await.map_err(storage_error)?;

        let file_name = format!("{}.{}", Uuid::new_v4(), sanitize_extension(extension));
        let path = self.root.join(&file_name);

        let mut file = tokio::fs::File::create(&path).await.map_err(storage_error)?;
        file.write_all(bytes).await.map_err(storage_error)?;
        file.flush().await.map_err(storage_error)?;
        file.sync_all().await.map_err(storage_error)?;
        drop(file);

        tracing::info!(path = %path.display(), size = bytes.len(), "Arquivo armazenado");
        Ok(format!("{}{}", UPLOADS_URL_PREFIX, file_name))
    }

    async fn delete(&self, url: &str) -> Result<(), AppError> {
        let Some(path) = self.path_for(url) else {
            tracing::warn!(%url, "URL fora do armazenamento local; nada a remover");
            return Ok(());
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Arquivo removido");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::StorageError(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_and_deletes_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().join("receipts"));

        let url = store.store(b"%PDF-1.4 comprovante", "pdf").await.unwrap();
        assert!(url.starts_with(UPLOADS_URL_PREFIX));
        assert!(url.ends_with(".pdf"));

        let path = store.path_for(&url).unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"%PDF-1.4 comprovante");

        store.delete(&url).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn deleting_twice_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        let url = store.store(b"x", "png").await.unwrap();

        store.delete(&url).await.unwrap();
        store.delete(&url).await.unwrap();
    }

    #[tokio::test]
    async fn foreign_urls_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        assert!(store.path_for("/_uploads/../../etc/passwd").is_none());
        assert!(store.path_for("https://cdn.exemplo.com/a.png").is_none());
        store.delete("/_uploads/../segredo").await.unwrap();
    }

    #[test]
    fn extensions_are_sanitized() {
        assert_eq!(sanitize_extension(".PDF"), "pdf");
        assert_eq!(sanitize_extension("../../sh"), "sh");
        assert_eq!(sanitize_extension(""), "bin");
    }
}
