use std::path::{Component, Path, PathBuf};

use base64::{engine::general_purpose, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, GenericImageView};

use crate::error::ThumbnailError;
use crate::options::BlurUp;

/// JPEG quality of blur placeholders. Detail is blurred away anyway.
pub const THUMBNAIL_QUALITY: u8 = 50;

/// Thumbnail dimensions whose short edge is `size`, keeping the aspect ratio.
pub fn thumbnail_dimensions(width: u32, height: u32, size: u32) -> (u32, u32) {
    let size = size.max(1) as f64;
    let (w, h) = (width as f64, height as f64);
    let (tw, th) = if w <= h {
        (size, size * h / w)
    } else {
        (size * w / h, size)
    };
    ((tw.round() as u32).max(1), (th.round() as u32).max(1))
}

/// Decodes `bytes` and returns a blurred JPEG placeholder as a data URI.
pub fn encode_blur_thumbnail(bytes: &[u8], blur: BlurUp) -> Result<String, ThumbnailError> {
    let img = image::load_from_memory(bytes).map_err(ThumbnailError::Decode)?;
    blur_thumbnail(&img, blur)
}

pub fn blur_thumbnail(img: &DynamicImage, blur: BlurUp) -> Result<String, ThumbnailError> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(ThumbnailError::EmptyImage);
    }

    let (tw, th) = thumbnail_dimensions(width, height, blur.size);
    let small = img.resize_exact(tw, th, image::imageops::FilterType::Triangle);
    let small = if blur.blur_radius > 0 {
        small.blur(blur.blur_radius as f32)
    } else {
        small
    };

    let rgb = small.to_rgb8();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, THUMBNAIL_QUALITY)
        .encode(rgb.as_raw(), tw, th, ColorType::Rgb8)
        .map_err(ThumbnailError::Encode)?;

    let encoded = general_purpose::STANDARD.encode(&jpeg);
    Ok(format!("data:image/jpeg;base64,{encoded}"))
}

/// Joins the site-relative `src` onto `root`. A leading `/` is relative to
/// `root`; `..` and drive prefixes are rejected.
pub fn resolve_under_root(root: impl AsRef<Path>, src: &str) -> Result<PathBuf, ThumbnailError> {
    let mut path = root.as_ref().to_path_buf();
    for component in Path::new(src).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir | Component::Prefix(_) => {
                return Err(ThumbnailError::OutsideRoot(src.to_string()))
            }
        }
    }
    Ok(path)
}

/// Reads `src` below `root` and builds its blur placeholder on a blocking
/// task, for servers that want to inline placeholders.
#[cfg(feature = "ssr")]
pub async fn load_blur_thumbnail(
    root: &str,
    src: &str,
    blur: BlurUp,
) -> Result<String, ThumbnailError> {
    let path = resolve_under_root(root, src)?;
    log::debug!("Creating blur placeholder for {}", path.display());

    let bytes = tokio::fs::read(&path).await?;
    tokio::task::spawn_blocking(move || encode_blur_thumbnail(&bytes, blur)).await?
}

#[cfg(test)]
mod thumbnail_tests {
    use super::*;
    use image::{ImageOutputFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 2) as u8, (y * 3) as u8, 128])
        });
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut bytes, ImageOutputFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    fn decode_uri(uri: &str) -> DynamicImage {
        let payload = uri.strip_prefix("data:image/jpeg;base64,").unwrap();
        let jpeg = general_purpose::STANDARD.decode(payload).unwrap();
        image::load_from_memory(&jpeg).unwrap()
    }

    #[test]
    fn short_edge_matches_size() {
        assert_eq!(thumbnail_dimensions(120, 60, 40), (80, 40));
        assert_eq!(thumbnail_dimensions(60, 120, 40), (40, 80));
        assert_eq!(thumbnail_dimensions(100, 100, 60), (60, 60));
        assert_eq!(thumbnail_dimensions(1000, 1, 1), (1000, 1));
    }

    #[test]
    fn creates_blurred_data_uri() {
        let uri = encode_blur_thumbnail(&png(120, 60), BlurUp::new(40, 20)).unwrap();

        let thumb = decode_uri(&uri);
        assert_eq!(thumb.dimensions(), (80, 40));
    }

    #[test]
    fn zero_radius_skips_blur() {
        let uri = encode_blur_thumbnail(&png(30, 90), BlurUp::new(10, 0)).unwrap();

        assert_eq!(decode_uri(&uri).dimensions(), (10, 30));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let result = encode_blur_thumbnail(b"not an image", BlurUp::default());
        assert!(matches!(result, Err(ThumbnailError::Decode(_))));
    }

    #[test]
    fn paths_stay_under_root() {
        assert_eq!(
            resolve_under_root("/srv/public", "/img/a.png").unwrap(),
            PathBuf::from("/srv/public/img/a.png")
        );
        assert_eq!(
            resolve_under_root("/srv/public", "./a.png").unwrap(),
            PathBuf::from("/srv/public/a.png")
        );
        assert!(matches!(
            resolve_under_root("/srv/public", "../secret.png"),
            Err(ThumbnailError::OutsideRoot(_))
        ));
        assert!(matches!(
            resolve_under_root("/srv/public", "/img/../../etc/passwd"),
            Err(ThumbnailError::OutsideRoot(_))
        ));
    }

    #[cfg(feature = "ssr")]
    #[test]
    fn loads_from_root() {
        let root = std::env::temp_dir().join("pixelperfect-thumbnail-test");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("ferris.png"), png(64, 32)).unwrap();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let root = root.to_string_lossy().to_string();
        let uri = runtime
            .block_on(load_blur_thumbnail(&root, "/ferris.png", BlurUp::new(16, 4)))
            .unwrap();
        assert_eq!(decode_uri(&uri).dimensions(), (32, 16));

        let missing = runtime.block_on(load_blur_thumbnail(&root, "missing.png", BlurUp::default()));
        assert!(matches!(missing, Err(ThumbnailError::IOError(_))));

        let escaped = runtime.block_on(load_blur_thumbnail(&root, "../ferris.png", BlurUp::default()));
        assert!(matches!(escaped, Err(ThumbnailError::OutsideRoot(_))));
    }
}
