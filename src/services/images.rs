use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::Utc;
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage, ImageReader};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    models::{
        images::{ImageUpload, IncomingFile, PostImage, ProcessedImage, StoredFile, UploadError, UploadLimits},
        posts::Post,
    },
    repositories::image_repo::ImagesRepository,
    Error, Result,
};

pub const PUBLIC_PREFIX: &str = "/uploads";

const MAX_WIDTH: u32 = 1200;
const MAX_HEIGHT: u32 = 800;
const FULL_QUALITY: u8 = 85;
const THUMB_WIDTH: u32 = 300;
const THUMB_HEIGHT: u32 = 200;
const THUMB_QUALITY: u8 = 80;

/// Staging directory for raw uploads plus the public directory that
/// serves the processed variants.
#[derive(Clone, Debug)]
pub struct ImageStorage {
    upload_dir: PathBuf,
    public_dir: PathBuf,
}

impl ImageStorage {
    pub fn new(upload_dir: impl Into<PathBuf>, public_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            public_dir: public_dir.into(),
        }
    }

    pub async fn ensure_dirs(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::create_dir_all(&self.public_dir).await?;
        info!(
            upload_dir = %self.upload_dir.display(),
            public_dir = %self.public_dir.display(),
            "Upload directories initialized"
        );
        Ok(())
    }

    async fn stage(&self, file: &IncomingFile) -> Result<StoredFile> {
        let filename = format!(
            "img-{}.{}",
            Uuid::now_v7().simple(),
            extension_for(&file.content_type)
        );
        let path = self.upload_dir.join(&filename);
        tokio::fs::write(&path, &file.bytes).await?;

        Ok(StoredFile { filename, path })
    }

    async fn process(&self, stored: &StoredFile) -> Result<ProcessedImage> {
        let stem = Path::new(&stored.filename)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&stored.filename);
        let filename = format!("{stem}.jpg");
        let thumbnail_filename = format!("thumb-{stem}.jpg");

        let source = stored.path.clone();
        let full_out = self.public_dir.join(&filename);
        let thumb_out = self.public_dir.join(&thumbnail_filename);

        let rendered = tokio::task::spawn_blocking({
            let (full_out, thumb_out) = (full_out.clone(), thumb_out.clone());
            move || render_variants(&source, &full_out, &thumb_out)
        })
        .await
        .map_err(|err| {
            error!("Image worker failed: {:?}", err);
            Error::InternalServerError
        })
        .and_then(|result| result);

        if let Err(err) = tokio::fs::remove_file(&stored.path).await {
            warn!(path = %stored.path.display(), "Could not remove staged upload: {}", err);
        }

        if let Err(err) = rendered {
            remove_quietly(&full_out).await;
            remove_quietly(&thumb_out).await;
            return Err(err);
        }

        Ok(ProcessedImage {
            public_path: format!("{PUBLIC_PREFIX}/{filename}"),
            thumbnail_path: format!("{PUBLIC_PREFIX}/{thumbnail_filename}"),
            filename,
            thumbnail_filename,
        })
    }

    async fn remove_variants(&self, filename: &str, thumbnail_filename: &str) {
        for name in [filename, thumbnail_filename] {
            let path = self.public_dir.join(name);
            if let Err(err) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), "Could not delete image file: {}", err);
            }
        }
    }
}

async fn remove_quietly(path: &Path) {
    let _ = tokio::fs::remove_file(path).await;
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type.to_ascii_lowercase().as_str() {
        "image/png" => "png",
        "image/gif" => "gif",
        _ => "jpg",
    }
}

fn render_variants(source: &Path, full_out: &Path, thumb_out: &Path) -> Result<()> {
    let img = ImageReader::open(source)?.with_guessed_format()?.decode()?;

    let full = if img.width() > MAX_WIDTH || img.height() > MAX_HEIGHT {
        img.resize(MAX_WIDTH, MAX_HEIGHT, FilterType::Lanczos3)
    } else {
        img.clone()
    };
    write_jpeg(&full, full_out, FULL_QUALITY)?;

    let thumb = img.resize_to_fill(THUMB_WIDTH, THUMB_HEIGHT, FilterType::Lanczos3);
    write_jpeg(&thumb, thumb_out, THUMB_QUALITY)
}

fn write_jpeg(img: &DynamicImage, path: &Path, quality: u8) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
    DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)?;
    writer.flush()?;
    Ok(())
}

#[derive(Clone)]
pub struct ImageService {
    repo: Arc<dyn ImagesRepository>,
    storage: ImageStorage,
    limits: UploadLimits,
}

impl ImageService {
    pub fn new(repo: Arc<dyn ImagesRepository>, storage: ImageStorage, limits: UploadLimits) -> Self {
        Self {
            repo,
            storage,
            limits,
        }
    }

    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    pub async fn ensure_dirs(&self) -> Result<()> {
        self.storage.ensure_dirs().await
    }

    /// Checks the whole batch against the limits, then stages every
    /// file. Nothing is staged when any file is rejected.
    pub async fn accept(&self, files: &[IncomingFile]) -> core::result::Result<Vec<StoredFile>, UploadError> {
        self.limits.check_batch(files)?;

        let mut stored = Vec::with_capacity(files.len());
        for file in files {
            match self.storage.stage(file).await {
                Ok(staged) => stored.push(staged),
                Err(err) => {
                    error!("Could not stage upload {}: {:?}", file.original_name, err);
                    for staged in &stored {
                        remove_quietly(&staged.path).await;
                    }
                    return Err(UploadError::Storage);
                }
            }
        }

        Ok(stored)
    }

    pub async fn process(&self, stored: &StoredFile) -> Result<ProcessedImage> {
        self.storage.process(stored).await
    }

    pub async fn persist(
        &self,
        post_id: Uuid,
        processed: ProcessedImage,
        caption: Option<&str>,
    ) -> Result<PostImage> {
        let image = PostImage {
            id: Uuid::now_v7(),
            post_id,
            filename: processed.filename,
            thumbnail_filename: processed.thumbnail_filename,
            public_path: processed.public_path,
            thumbnail_path: processed.thumbnail_path,
            caption: caption.map(str::to_string),
            created_at: Utc::now(),
        };
        self.repo.insert_image(&image).await?;

        Ok(image)
    }

    /// Accept, process and persist every file of `upload` for the post.
    /// Failures are reported per file and never abort the batch.
    pub async fn attach(&self, post_id: Uuid, upload: &ImageUpload) -> (Vec<PostImage>, Vec<String>) {
        let mut saved = Vec::new();
        let mut errors = Vec::new();

        if upload.files.is_empty() {
            return (saved, errors);
        }

        let stored = match self.accept(&upload.files).await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(%post_id, "Image batch rejected: {}", err);
                errors.push(err.to_string());
                return (saved, errors);
            }
        };

        let caption = upload
            .caption
            .as_deref()
            .map(str::trim)
            .filter(|caption| !caption.is_empty());

        for (file, staged) in upload.files.iter().zip(stored) {
            let processed = match self.process(&staged).await {
                Ok(processed) => processed,
                Err(err) => {
                    warn!(%post_id, "Failed to process image {}: {:?}", file.original_name, err);
                    errors.push(format!("Failed to process image {}", file.original_name));
                    continue;
                }
            };

            let (filename, thumbnail_filename) =
                (processed.filename.clone(), processed.thumbnail_filename.clone());
            match self.persist(post_id, processed, caption).await {
                Ok(image) => saved.push(image),
                Err(err) => {
                    warn!(%post_id, "Failed to save image {}: {:?}", file.original_name, err);
                    self.storage
                        .remove_variants(&filename, &thumbnail_filename)
                        .await;
                    errors.push(format!("Failed to save image {}", file.original_name));
                }
            }
        }

        info!(%post_id, saved = saved.len(), failed = errors.len(), "Images attached");
        (saved, errors)
    }

    pub async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<PostImage>> {
        self.repo.images_for_post(post_id).await
    }

    /// Fills `images` on each post with one query.
    pub async fn load_into(&self, posts: &mut [Post]) -> Result<()> {
        let ids: Vec<Uuid> = posts.iter().map(|post| post.id).collect();
        let mut images = self.repo.images_for_posts(&ids).await?;

        for post in posts.iter_mut() {
            let (owned, rest): (Vec<_>, Vec<_>) =
                images.into_iter().partition(|image| image.post_id == post.id);
            post.images = owned;
            images = rest;
        }

        Ok(())
    }

    pub async fn delete(&self, image_id: &str) -> Result<()> {
        let image_id = Uuid::parse_str(image_id).map_err(|_| Error::NotFound)?;
        let image = self.repo.get_image(image_id).await?.ok_or(Error::NotFound)?;

        self.remove_files(&image).await;
        self.repo.delete_image(image_id).await?;

        info!(%image_id, post_id = %image.post_id, "Image deleted");
        Ok(())
    }

    pub async fn remove_files(&self, image: &PostImage) {
        self.storage
            .remove_variants(&image.filename, &image.thumbnail_filename)
            .await;
    }

    pub async fn cleanup_orphaned(&self) -> Result<u64> {
        let orphaned = self.repo.orphaned_images().await?;
        let mut deleted_count = 0;

        for image in orphaned {
            match self.delete(&image.id.to_string()).await {
                Ok(()) => deleted_count += 1,
                Err(err) => warn!(image_id = %image.id, "Could not delete orphaned image: {:?}", err),
            }
        }

        info!(deleted_count, "Orphaned image cleanup finished");
        Ok(deleted_count)
    }

    pub async fn count(&self) -> Result<i64> {
        self.repo.count_images().await
    }
}
