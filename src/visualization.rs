use opencv::{
    core::{Mat, Point, Scalar},
    imgproc,
    prelude::*,
};

use crate::motion::ObjectClass;
use crate::session::TrackingSession;
use crate::tracker::Tracker;

/// BGR drawing color of a class.
pub fn class_color(class: ObjectClass) -> Scalar {
    match class {
        ObjectClass::Ring => Scalar::new(255.0, 0.0, 0.0, 0.0),        // Blue
        ObjectClass::Necklace => Scalar::new(0.0, 255.0, 0.0, 0.0),    // Green
        ObjectClass::EarringPair => Scalar::new(0.0, 0.0, 255.0, 0.0), // Red
        ObjectClass::Bracelet => Scalar::new(0.0, 255.0, 255.0, 0.0),  // Yellow
    }
}

fn point(x: f32, y: f32) -> Point {
    Point::new(x.round() as i32, y.round() as i32)
}

/// Draw text with a black outline so it stays readable on the belt.
pub fn draw_text(frame: &mut Mat, text: &str, org: Point, font_scale: f64, color: Scalar) -> opencv::Result<()> {
    imgproc::put_text(
        frame,
        text,
        org,
        imgproc::FONT_HERSHEY_SIMPLEX,
        font_scale,
        Scalar::new(0.0, 0.0, 0.0, 0.0),
        3,
        imgproc::LINE_AA,
        false,
    )?;
    imgproc::put_text(
        frame,
        text,
        org,
        imgproc::FONT_HERSHEY_SIMPLEX,
        font_scale,
        color,
        1,
        imgproc::LINE_AA,
        false,
    )
}

/// Trajectory, current position and slot number of every visible object.
pub fn draw_tracker(frame: &mut Mat, tracker: &Tracker) -> opencv::Result<()> {
    let color = class_color(tracker.class());

    for (idx, object) in tracker.objects().iter().enumerate() {
        if !object.is_visible() {
            continue;
        }

        for step in object.history().windows(2) {
            imgproc::line(
                frame,
                point(step[0].x, step[0].y),
                point(step[1].x, step[1].y),
                color,
                2,
                imgproc::LINE_8,
                0,
            )?;
        }

        let last = object.last();
        let centre = point(last.x, last.y);
        let radius = ((last.size / 2.0).round() as i32).max(3);
        // Thinner ring while the object is coasting on prediction
        let thickness = if object.missing_frame_count() == 0 { 3 } else { 1 };
        imgproc::circle(frame, centre, radius, color, thickness, imgproc::LINE_8, 0)?;

        let label = format!("{} #{}", tracker.class(), idx);
        draw_text(frame, &label, Point::new(centre.x, centre.y - radius - 5), 0.5, color)?;
    }

    Ok(())
}

/// Per-class object counts and the frame number in the top-left corner.
pub fn draw_counts(frame: &mut Mat, session: &TrackingSession) -> opencv::Result<()> {
    let white = Scalar::new(255.0, 255.0, 255.0, 0.0);
    draw_text(
        frame,
        &format!("Frame: {}", session.frame_count()),
        Point::new(10, 30),
        0.7,
        white,
    )?;

    for (row, tracker) in session.trackers().enumerate() {
        let text = format!("{}: {}", tracker.class(), tracker.objects().len());
        let org = Point::new(10, 60 + 28 * row as i32);
        draw_text(frame, &text, org, 0.7, class_color(tracker.class()))?;
    }
    Ok(())
}

/// Full overlay for one processed frame.
pub fn draw_session(frame: &mut Mat, session: &TrackingSession) -> opencv::Result<()> {
    for tracker in session.trackers() {
        draw_tracker(frame, tracker)?;
    }
    draw_counts(frame, session)
}
