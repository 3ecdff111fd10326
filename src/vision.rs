//! Frame acquisition and blob detection feeding the trackers.
//!
//! Everything here sits in front of the tracking core: it turns raw video
//! frames into per-class [`FrameDetections`].

use log::{debug, info, warn};
use opencv::{
    core::{self, KeyPoint, Mat, Point, Ptr, Scalar, Size, Vector},
    features2d::{SimpleBlobDetector, SimpleBlobDetector_Params},
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};
use std::collections::BTreeMap;
use std::path::Path;
use std::thread;
use std::time::Duration;

use crate::detection::{Detection, FrameDetections};
use crate::error::{Result, TrackError};
use crate::motion::ObjectClass;

const OPEN_ATTEMPTS: u32 = 3;
const OPEN_DELAY: Duration = Duration::from_secs(2);
const READ_ATTEMPTS: u32 = 3;
const READ_BACKOFF: Duration = Duration::from_millis(1);

/// Video file reader that retries flaky opens and reads.
pub struct VideoSource {
    capture: VideoCapture,
    frame_no: u64,
}

impl VideoSource {
    pub fn open<P: AsRef<Path>>(path: P, width: i32, height: i32) -> Result<Self> {
        let path = path.as_ref().to_string_lossy().into_owned();
        for attempt in 1..=OPEN_ATTEMPTS {
            let mut capture = VideoCapture::from_file(&path, videoio::CAP_ANY)?;
            if capture.is_opened()? {
                capture.set(videoio::CAP_PROP_FRAME_WIDTH, width as f64)?;
                capture.set(videoio::CAP_PROP_FRAME_HEIGHT, height as f64)?;
                info!("opened {} on attempt {}", path, attempt);
                return Ok(VideoSource { capture, frame_no: 0 });
            }
            warn!("could not open {} (attempt {}/{})", path, attempt, OPEN_ATTEMPTS);
            thread::sleep(OPEN_DELAY);
        }
        Err(TrackError::Video(format!("could not open video file {}", path)))
    }

    /// Position of the last frame returned, as reported by the decoder.
    pub fn frame_no(&self) -> u64 {
        self.frame_no
    }

    /// Next frame, or `None` once the video has ended.
    pub fn next_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        for attempt in 1..=READ_ATTEMPTS {
            if self.capture.read(&mut frame)? && !frame.empty() {
                self.frame_no = self.capture.get(videoio::CAP_PROP_POS_FRAMES)? as u64;
                return Ok(Some(frame));
            }
            thread::sleep(READ_BACKOFF * attempt);
        }
        info!("video ended after {} frames", self.frame_no);
        Ok(None)
    }
}

/// The two binary-ish images the blob detectors work on.
pub struct PreparedFrames {
    /// Closed edge map, used for rings
    pub rings: Mat,
    /// Grayscale frame with edge contours filled black, used for earrings and necklaces
    pub filled: Mat,
}

/// Edge-based frame preparation.
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    pub blur_kernel: i32,
    pub canny_low: f64,
    pub canny_high: f64,
    pub closing_radius: i32,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Preprocessor {
            blur_kernel: 5,
            canny_low: 60.0,
            canny_high: 255.0,
            closing_radius: 2,
        }
    }
}

impl Preprocessor {
    pub fn prepare(&self, frame: &Mat) -> Result<PreparedFrames> {
        let mut gray = Mat::default();
        imgproc::cvt_color_def(frame, &mut gray, imgproc::COLOR_BGR2GRAY)?;

        let mut blurred = Mat::default();
        imgproc::gaussian_blur_def(
            &gray,
            &mut blurred,
            Size::new(self.blur_kernel, self.blur_kernel),
            0.0,
        )?;

        let mut edges = Mat::default();
        imgproc::canny_def(&blurred, &mut edges, self.canny_low, self.canny_high)?;

        let diameter = 2 * self.closing_radius + 1;
        let kernel = imgproc::get_structuring_element_def(
            imgproc::MORPH_ELLIPSE,
            Size::new(diameter, diameter),
        )?;
        let mut rings = Mat::default();
        imgproc::morphology_ex_def(&edges, &mut rings, imgproc::MORPH_CLOSE, &kernel)?;

        let mut contours = Vector::<Vector<Point>>::new();
        imgproc::find_contours_def(
            &rings,
            &mut contours,
            imgproc::RETR_EXTERNAL,
            imgproc::CHAIN_APPROX_SIMPLE,
        )?;

        let mut filled = gray.try_clone()?;
        imgproc::draw_contours(
            &mut filled,
            &contours,
            -1,
            Scalar::all(0.0),
            imgproc::FILLED,
            imgproc::LINE_8,
            &core::no_array(),
            i32::MAX,
            Point::new(0, 0),
        )?;

        Ok(PreparedFrames { rings, filled })
    }
}

/// Shape filters of a blob detector.
#[derive(Debug, Clone, Copy)]
pub struct BlobParams {
    pub filter_by_area: bool,
    pub min_area: f32,
    pub max_area: f32,
    pub filter_by_circularity: bool,
    pub min_circularity: f32,
    pub filter_by_convexity: bool,
    pub min_convexity: f32,
    pub filter_by_inertia: bool,
    pub min_inertia_ratio: f32,
}

impl Default for BlobParams {
    fn default() -> Self {
        BlobParams {
            filter_by_area: true,
            min_area: 400.0,
            max_area: 40_000.0,
            filter_by_circularity: true,
            min_circularity: 0.05,
            filter_by_convexity: false,
            min_convexity: 0.1,
            filter_by_inertia: false,
            min_inertia_ratio: 0.2,
        }
    }
}

/// SimpleBlobDetector producing tracker detections.
pub struct BlobDetector {
    inner: Ptr<SimpleBlobDetector>,
}

impl BlobDetector {
    pub fn new(params: &BlobParams) -> Result<Self> {
        let mut cv_params = SimpleBlobDetector_Params::default()?;
        cv_params.filter_by_area = params.filter_by_area;
        cv_params.min_area = params.min_area;
        cv_params.max_area = params.max_area;
        cv_params.filter_by_circularity = params.filter_by_circularity;
        cv_params.min_circularity = params.min_circularity;
        cv_params.filter_by_convexity = params.filter_by_convexity;
        cv_params.min_convexity = params.min_convexity;
        cv_params.filter_by_inertia = params.filter_by_inertia;
        cv_params.min_inertia_ratio = params.min_inertia_ratio;

        Ok(BlobDetector {
            inner: SimpleBlobDetector::create(cv_params)?,
        })
    }

    pub fn detect(&mut self, image: &Mat) -> Result<Vec<Detection>> {
        let mut keypoints = Vector::<KeyPoint>::new();
        self.inner.detect(image, &mut keypoints, &core::no_array())?;
        Ok(keypoints
            .iter()
            .map(|kp| {
                let pt = kp.pt();
                Detection::new(pt.x, pt.y, kp.size())
            })
            .collect())
    }
}

/// Which prepared image a class is detected on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Rings,
    Filled,
}

/// Runs one blob detector per class over each frame.
pub struct JewelryDetector {
    preprocessor: Preprocessor,
    detectors: BTreeMap<ObjectClass, (Source, BlobDetector)>,
}

impl JewelryDetector {
    /// Detectors for the classes the belt camera can see, with default filters.
    pub fn new() -> Result<Self> {
        let params = BlobParams::default();
        let mut detectors = BTreeMap::new();
        detectors.insert(ObjectClass::Ring, (Source::Rings, BlobDetector::new(&params)?));
        detectors.insert(
            ObjectClass::EarringPair,
            (Source::Filled, BlobDetector::new(&params)?),
        );
        detectors.insert(
            ObjectClass::Necklace,
            (Source::Filled, BlobDetector::new(&params)?),
        );
        Ok(JewelryDetector {
            preprocessor: Preprocessor::default(),
            detectors,
        })
    }

    pub fn with_preprocessor(mut self, preprocessor: Preprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn detect_frame(&mut self, frame: &Mat, frame_id: u64) -> Result<FrameDetections> {
        let prepared = self.preprocessor.prepare(frame)?;
        let mut result = FrameDetections::new(frame_id);
        for (class, (source, detector)) in self.detectors.iter_mut() {
            let image = match source {
                Source::Rings => &prepared.rings,
                Source::Filled => &prepared.filled,
            };
            let found = detector.detect(image)?;
            debug!("frame {}: {} {} blobs", frame_id, found.len(), class);
            result.detections.insert(*class, found);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::CV_8UC3;

    fn blank_frame() -> Mat {
        Mat::new_rows_cols_with_default(480, 640, CV_8UC3, Scalar::all(255.0)).unwrap()
    }

    #[test]
    fn test_prepare_keeps_frame_size() {
        let frame = blank_frame();
        let prepared = Preprocessor::default().prepare(&frame).unwrap();
        assert_eq!(prepared.rings.size().unwrap(), frame.size().unwrap());
        assert_eq!(prepared.filled.size().unwrap(), frame.size().unwrap());
    }

    #[test]
    fn test_blank_frame_has_no_detections() {
        let mut detector = JewelryDetector::new().unwrap();
        let result = detector.detect_frame(&blank_frame(), 7).unwrap();
        assert_eq!(result.frame_id, 7);
        assert!(result.detections.values().all(Vec::is_empty));
    }

    #[test]
    fn test_dark_disc_is_detected() {
        let mut image = Mat::new_rows_cols_with_default(
            480,
            640,
            opencv::core::CV_8UC1,
            Scalar::all(255.0),
        )
        .unwrap();
        imgproc::circle(
            &mut image,
            Point::new(320, 240),
            30,
            Scalar::all(0.0),
            imgproc::FILLED,
            imgproc::LINE_8,
            0,
        )
        .unwrap();

        let mut detector = BlobDetector::new(&BlobParams::default()).unwrap();
        let found = detector.detect(&image).unwrap();
        assert_eq!(found.len(), 1);
        assert!((found[0].x - 320.0).abs() < 2.0);
        assert!((found[0].y - 240.0).abs() < 2.0);
    }
}
