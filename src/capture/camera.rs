// src/capture/camera.rs
use log::info;

use super::photo::CapturedImage;
use crate::error::TriageError;

/// A still-frame camera device. Implementations wrap a platform media API.
pub trait CameraDevice {
    /// Acquire the device. Returns `CaptureAccessDenied` when permission is
    /// refused or the device is busy.
    fn open(&mut self) -> Result<(), TriageError>;

    /// Grab one encoded frame from the open device.
    fn grab_frame(&mut self) -> Result<CapturedImage, TriageError>;

    /// Release the device. Must be safe to call more than once.
    fn release(&mut self);
}

/// Scoped camera acquisition.
///
/// The device is released on every exit path: successful capture, failed
/// grab, explicit cancel, and drop. A denied `open` never yields a session.
pub struct CameraSession<'a, D: CameraDevice> {
    device: &'a mut D,
    released: bool,
}

impl<'a, D: CameraDevice> CameraSession<'a, D> {
    pub fn open(device: &'a mut D) -> Result<Self, TriageError> {
        if let Err(err) = device.open() {
            // A device can partially acquire the stream before denying;
            // release is safe to call repeatedly.
            device.release();
            return Err(err);
        }
        info!("Camera device acquired");
        Ok(Self {
            device,
            released: false,
        })
    }

    /// Grab a single frame, then release the device.
    pub fn capture(mut self) -> Result<CapturedImage, TriageError> {
        let frame = self.device.grab_frame();
        self.release_now();
        frame
    }

    /// Give up without capturing. The device is released.
    pub fn cancel(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if !self.released {
            self.device.release();
            self.released = true;
            info!("Camera device released");
        }
    }
}

impl<D: CameraDevice> Drop for CameraSession<'_, D> {
    fn drop(&mut self) {
        self.release_now();
    }
}

/// Open the device, grab one frame and release, in one call.
pub fn capture_single_frame<D: CameraDevice>(device: &mut D) -> Result<CapturedImage, TriageError> {
    CameraSession::open(device)?.capture()
}
