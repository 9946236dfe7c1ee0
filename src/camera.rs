// Live camera as a frame source.
// Each poll grabs one frame from the default webcam and converts it to a FrameBuffer.
// nokhwa camera handles are not `Send`, so build this with `Producer::spawn_with`.

use std::time::Duration;

// Bring in nokhwa types for camera control.
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    },
};

use crate::error::SourceError;
use crate::producer::FrameSource;
use crate::types::FrameBuffer;

pub struct CameraSource {
    cam: Camera,
    width: u32,
    height: u32,
    interval: Duration,
}

impl CameraSource {
    /// Open camera `index` at roughly `width x height`; the device may pick a nearby
    /// resolution.
    pub fn new(
        index: u32,
        width: u32,
        height: u32,
        interval: Duration,
    ) -> Result<Self, SourceError> {
        let idx = CameraIndex::Index(index);

        let fmt = CameraFormat::new(
            Resolution::new(width, height),
            FrameFormat::YUYV, // uncompressed; cheap to convert to RGB
            30,
        );
        let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

        let mut cam = Camera::new(idx, req)
            .map_err(|e| SourceError::CameraInit(format!("create camera: {e}")))?;
        cam.open_stream()
            .map_err(|e| SourceError::CameraInit(format!("open stream: {e}")))?;

        let actual = cam.resolution();
        tracing::info!(
            index,
            width = actual.width(),
            height = actual.height(),
            "camera stream open"
        );

        Ok(Self {
            cam,
            width: actual.width(),
            height: actual.height(),
            interval,
        })
    }

    /// The resolution the camera is actually delivering.
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl FrameSource for CameraSource {
    fn describe(&self) -> String {
        format!("camera {}x{}", self.width, self.height)
    }

    fn poll_frame(&mut self) -> Result<Option<FrameBuffer>, SourceError> {
        // Blocks until the camera has a new frame.
        let frame = self
            .cam
            .frame()
            .map_err(|e| SourceError::CameraFrame(format!("fetch frame: {e}")))?;

        let rgb_img = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| SourceError::CameraFrame(format!("decode RGB: {e}")))?;

        Ok(Some(FrameBuffer::from_rgb_image(&rgb_img)?))
    }

    fn interval(&self) -> Duration {
        self.interval
    }
}
