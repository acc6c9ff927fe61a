use crate::error::{GalleryError, Result};
use crate::model::Gallery;
use crate::storage::DynRecordStore;

#[derive(Clone)]
pub struct CreateGalleryOperation {
    records: DynRecordStore,
}

#[derive(Debug, Clone)]
pub struct CreateGalleryOperationRequest {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct CreateGalleryOperationResult {
    pub gallery: Gallery,
}

impl CreateGalleryOperation {
    pub fn new(records: DynRecordStore) -> Self {
        Self { records }
    }

    pub async fn run(
        &self,
        request: CreateGalleryOperationRequest,
    ) -> Result<CreateGalleryOperationResult> {
        let CreateGalleryOperationRequest { name, description } = request;
        validate_gallery_name(&name)?;

        let gallery = Gallery::new(name, description);
        self.records.insert_gallery(&gallery).await?;

        tracing::info!("Created gallery {}", gallery.name);
        Ok(CreateGalleryOperationResult { gallery })
    }

    /// Returns the existing gallery or creates an empty one.
    pub async fn ensure(&self, name: &str) -> Result<Gallery> {
        validate_gallery_name(name)?;
        if let Some(gallery) = self.records.find_gallery(name).await? {
            return Ok(gallery);
        }

        let gallery = Gallery::new(name, "");
        match self.records.insert_gallery(&gallery).await {
            Ok(()) => {
                tracing::info!("Created gallery {} on first upload", name);
                Ok(gallery)
            }
            // created concurrently
            Err(GalleryError::DuplicateKey(_)) => self.records.get_gallery(name).await,
            Err(error) => Err(error),
        }
    }
}

pub(crate) fn validate_gallery_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(GalleryError::InvalidArgument(
            "gallery name must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestEnv;

    fn request(name: &str) -> CreateGalleryOperationRequest {
        CreateGalleryOperationRequest {
            name: name.to_string(),
            description: "holiday".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_gallery() {
        let env = TestEnv::new();
        let operation = CreateGalleryOperation::new(env.records.clone());

        let result = operation.run(request("trip")).await.unwrap();
        assert!(result.gallery.is_empty());
        assert_eq!(result.gallery.description, "holiday");

        let err = operation.run(request("trip")).await.unwrap_err();
        assert!(matches!(err, GalleryError::DuplicateKey(_)));

        let err = operation.run(request("  ")).await.unwrap_err();
        assert!(matches!(err, GalleryError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let env = TestEnv::new();
        let operation = CreateGalleryOperation::new(env.records.clone());

        operation.ensure("g").await.unwrap();
        operation.ensure("g").await.unwrap();
        assert_eq!(env.records.list_galleries().await.unwrap().len(), 1);
    }
}
