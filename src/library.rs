use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use image::RgbaImage;
use image::codecs::png::PngEncoder;
use tracing::{info, warn};

use crate::error::{EditorError, Result};

/// Where flattened images end up.
pub trait PhotoLibrary: Send + Sync {
    fn write_image(&self, image: &RgbaImage) -> Result<PathBuf>;
}

/// A plain directory acting as the photo album. Files are named after the
/// moment they were saved.
pub struct AlbumDirectory {
    root: PathBuf,
}

impl AlbumDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the first `stem.png`, `stem_1.png`, ... that does not exist
    /// yet. Creation is atomic, so concurrent saves never share a file.
    fn create_unique(&self, stem: &str) -> Result<(PathBuf, File)> {
        let mut n = 0;
        loop {
            let path = match n {
                0 => self.root.join(format!("{stem}.png")),
                n => self.root.join(format!("{stem}_{n}.png")),
            };
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => n += 1,
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn encode_png(image: &RgbaImage, file: File) -> Result<()> {
    let mut writer = BufWriter::new(file);
    image
        .write_with_encoder(PngEncoder::new(&mut writer))
        .map_err(EditorError::Encode)?;
    writer.flush()?;
    Ok(())
}

impl PhotoLibrary for AlbumDirectory {
    fn write_image(&self, image: &RgbaImage) -> Result<PathBuf> {
        fs::create_dir_all(&self.root)?;
        let stem = chrono::Local::now().format("IMG_%Y%m%d_%H%M%S").to_string();
        let (path, file) = self.create_unique(&stem)?;
        if let Err(err) = encode_png(image, file) {
            // Leave no empty or truncated file behind.
            let _ = fs::remove_file(&path);
            return Err(err);
        }
        Ok(path)
    }
}

/// A save running on a worker thread. Poll it from the UI thread.
pub struct PendingSave {
    rx: Receiver<Result<PathBuf>>,
}

impl PendingSave {
    /// Hands `image` to `library` on a worker thread. `notify` runs once the
    /// result is ready so the UI can wake up and poll.
    pub fn submit(
        library: Arc<dyn PhotoLibrary>,
        image: RgbaImage,
        notify: impl FnOnce() + Send + 'static,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let result = library.write_image(&image);
            match &result {
                Ok(path) => info!(path = %path.display(), "image written to album"),
                Err(err) => warn!(%err, "writing image to album failed"),
            }
            // The receiver may be gone if the window closed mid-save.
            let _ = tx.send(result);
            notify();
        });
        Self { rx }
    }

    /// `None` while the write is still running.
    pub fn try_finish(&self) -> Option<Result<PathBuf>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(EditorError::SaveWorker)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::time::Duration;
    use tempfile::tempdir;

    struct FailingLibrary;

    impl PhotoLibrary for FailingLibrary {
        fn write_image(&self, _image: &RgbaImage) -> Result<PathBuf> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "album is read-only").into())
        }
    }

    fn wait(pending: &PendingSave) -> Result<PathBuf> {
        for _ in 0..500 {
            if let Some(result) = pending.try_finish() {
                return result;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("save did not finish");
    }

    #[test]
    fn album_writes_png_and_avoids_collisions() {
        let dir = tempdir().expect("failed to create temp dir");
        let album = AlbumDirectory::new(dir.path().join("album"));
        let image = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255]));

        let first = album.write_image(&image).expect("first write");
        let second = album.write_image(&image).expect("second write");

        assert_ne!(first, second);
        let loaded = image::open(&first).expect("decode").to_rgba8();
        assert_eq!(loaded, image);
        assert_eq!(first.extension().and_then(|e| e.to_str()), Some("png"));
    }

    #[test]
    fn existing_file_with_the_same_name_is_skipped() {
        let dir = tempdir().expect("failed to create temp dir");
        let album = AlbumDirectory::new(dir.path());
        fs::write(dir.path().join("IMG_x.png"), b"taken").expect("seed file");

        let (path, _file) = album.create_unique("IMG_x").expect("reserve");

        assert_eq!(path, dir.path().join("IMG_x_1.png"));
        assert_eq!(fs::read(dir.path().join("IMG_x.png")).expect("read"), b"taken");
    }

    #[test]
    fn concurrent_reservations_get_distinct_files() {
        let dir = tempdir().expect("failed to create temp dir");
        let album = Arc::new(AlbumDirectory::new(dir.path()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let album = Arc::clone(&album);
                thread::spawn(move || album.create_unique("IMG_same").expect("reserve").0)
            })
            .collect();
        let mut paths: Vec<PathBuf> = handles
            .into_iter()
            .map(|handle| handle.join().expect("thread"))
            .collect();
        paths.sort();
        paths.dedup();

        assert_eq!(paths.len(), 8);
    }

    #[test]
    fn pending_save_reports_success_and_notifies() {
        let dir = tempdir().expect("failed to create temp dir");
        let album: Arc<dyn PhotoLibrary> = Arc::new(AlbumDirectory::new(dir.path()));
        let (notify_tx, notify_rx) = mpsc::channel();

        let pending = PendingSave::submit(album, RgbaImage::new(4, 4), move || {
            let _ = notify_tx.send(());
        });

        let path = wait(&pending).expect("saved");
        assert!(path.starts_with(dir.path()));
        notify_rx.recv_timeout(Duration::from_secs(5)).expect("notified");
    }

    #[test]
    fn pending_save_surfaces_library_error_text() {
        let pending = PendingSave::submit(Arc::new(FailingLibrary), RgbaImage::new(1, 1), || {});
        let err = wait(&pending).expect_err("should fail");
        assert_eq!(err.to_string(), "album is read-only");
    }
}
