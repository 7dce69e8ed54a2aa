//! Conversions between `Frame` (RGB8) and OpenCV `Mat` (BGR8).

use anyhow::{anyhow, Context, Result};
use opencv::{
    core::{self, Mat, Scalar},
    imgproc,
    prelude::*,
};

use crate::frame::Frame;

/// Copy a frame into a freshly allocated BGR `Mat`.
pub(crate) fn frame_to_mat(frame: &Frame) -> Result<Mat> {
    let mut rgb = Mat::new_rows_cols_with_default(
        frame.height() as i32,
        frame.width() as i32,
        core::CV_8UC3,
        Scalar::all(0.0),
    )
    .context("allocate RGB mat")?;
    rgb.data_bytes_mut()
        .context("access RGB mat bytes")?
        .copy_from_slice(frame.pixels());

    let mut bgr = Mat::default();
    imgproc::cvt_color_def(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR).context("convert RGB to BGR")?;
    Ok(bgr)
}

/// Convert a decoded BGR `Mat` into a frame.
pub(crate) fn mat_to_frame(mat: &Mat, index: u64) -> Result<Frame> {
    if mat.empty() {
        return Err(anyhow!("decoded mat is empty"));
    }
    let mut rgb = Mat::default();
    imgproc::cvt_color_def(mat, &mut rgb, imgproc::COLOR_BGR2RGB).context("convert BGR to RGB")?;
    let pixels = rgb.data_bytes().context("access RGB mat bytes")?.to_vec();
    Frame::from_rgb(rgb.cols() as u32, rgb.rows() as u32, pixels, index)
}
