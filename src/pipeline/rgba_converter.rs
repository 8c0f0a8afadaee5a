use std::convert::TryFrom;

use rayon::prelude::*;
use thiserror::Error;
use yuv::{
    YuvBiPlanarImage, YuvConversionMode, YuvPackedImage, YuvRange, YuvStandardMatrix,
    yuv_nv12_to_rgba, yuyv422_to_rgba,
};
use zune_jpeg::{
    JpegDecoder,
    zune_core::{bytestream::ZCursor, colorspace::ColorSpace, options::DecoderOptions},
};

use crate::types::{PixelBuffer, PixelEncoding, VideoFrame};

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("frame is {got_width}x{got_height}, buffer is {width}x{height}")]
    GeometryMismatch {
        width: u32,
        height: u32,
        got_width: u32,
        got_height: u32,
    },
    #[error("{encoding} buffer too small: got {got}, expected {expected}")]
    PayloadTooSmall {
        encoding: &'static str,
        got: usize,
        expected: usize,
    },
    #[error("{encoding} decode failed: {message}")]
    Decode {
        encoding: &'static str,
        message: String,
    },
}

/// Overwrites every pixel of `buffer` with `frame` converted to RGBA.
///
/// The payload is validated before the first byte is written, so on error the
/// buffer still holds the previous frame.
pub fn convert_into(frame: &VideoFrame, buffer: &mut PixelBuffer) -> Result<(), ConvertError> {
    let (width, height) = (buffer.width(), buffer.height());
    if frame.width != width || frame.height != height {
        return Err(ConvertError::GeometryMismatch {
            width,
            height,
            got_width: frame.width,
            got_height: frame.height,
        });
    }

    if let Some(expected) = frame.encoding.raw_len(width, height) {
        if frame.data.len() < expected {
            return Err(ConvertError::PayloadTooSmall {
                encoding: frame.encoding.label(),
                got: frame.data.len(),
                expected,
            });
        }
    }

    let data = frame.data.as_slice();
    let rgba = buffer.as_mut_bytes();
    match frame.encoding {
        PixelEncoding::Bgra => bgra_to_rgba(data, rgba),
        PixelEncoding::Rgba => {
            rgba.copy_from_slice(&data[..rgba.len()]);
            Ok(())
        }
        PixelEncoding::Rgb => rgb_like_to_rgba(data, rgba, false),
        PixelEncoding::Bgr => rgb_like_to_rgba(data, rgba, true),
        PixelEncoding::Gray => gray_to_rgba(data, rgba),
        PixelEncoding::Yuyv => yuyv_to_rgba(data, rgba, width, height),
        PixelEncoding::Nv12 => nv12_to_rgba(data, rgba, width, height),
        PixelEncoding::Mjpeg => mjpeg_to_rgba(data, rgba, width, height),
    }
}

fn bgra_to_rgba(data: &[u8], rgba: &mut [u8]) -> Result<(), ConvertError> {
    rgba.par_chunks_exact_mut(4)
        .zip(data.par_chunks_exact(4))
        .for_each(|(dst, src)| {
            dst[0] = src[2];
            dst[1] = src[1];
            dst[2] = src[0];
            dst[3] = src[3];
        });
    Ok(())
}

fn rgb_like_to_rgba(data: &[u8], rgba: &mut [u8], swap_rb: bool) -> Result<(), ConvertError> {
    rgba.par_chunks_exact_mut(4)
        .zip(data.par_chunks_exact(3))
        .for_each(|(dst, src)| {
            if swap_rb {
                dst[0] = src[2];
                dst[1] = src[1];
                dst[2] = src[0];
            } else {
                dst[0] = src[0];
                dst[1] = src[1];
                dst[2] = src[2];
            }
            dst[3] = 255;
        });
    Ok(())
}

fn gray_to_rgba(data: &[u8], rgba: &mut [u8]) -> Result<(), ConvertError> {
    rgba.par_chunks_exact_mut(4)
        .zip(data.par_iter().copied())
        .for_each(|(dst, value)| {
            dst[0] = value;
            dst[1] = value;
            dst[2] = value;
            dst[3] = 255;
        });
    Ok(())
}

fn yuyv_to_rgba(data: &[u8], rgba: &mut [u8], width: u32, height: u32) -> Result<(), ConvertError> {
    let packed = YuvPackedImage {
        yuy: data,
        yuy_stride: width * 2,
        width,
        height,
    };

    yuyv422_to_rgba(
        &packed,
        rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
    )
    .map_err(|err| ConvertError::Decode {
        encoding: "YUYV",
        message: format!("{err:?}"),
    })
}

fn nv12_to_rgba(data: &[u8], rgba: &mut [u8], width: u32, height: u32) -> Result<(), ConvertError> {
    let y_plane_len = width as usize * height as usize;
    let uv_plane_len = y_plane_len / 2;

    let image = YuvBiPlanarImage {
        y_plane: &data[..y_plane_len],
        y_stride: width,
        uv_plane: &data[y_plane_len..y_plane_len + uv_plane_len],
        uv_stride: width,
        width,
        height,
    };

    yuv_nv12_to_rgba(
        &image,
        rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
        YuvConversionMode::Balanced,
    )
    .map_err(|err| ConvertError::Decode {
        encoding: "NV12",
        message: format!("{err:?}"),
    })
}

fn mjpeg_to_rgba(data: &[u8], rgba: &mut [u8], width: u32, height: u32) -> Result<(), ConvertError> {
    let decode_error = |err: zune_jpeg::errors::DecodeErrors| ConvertError::Decode {
        encoding: "MJPEG",
        message: format!("{err:?}"),
    };
    let options = DecoderOptions::default().jpeg_set_out_colorspace(ColorSpace::RGBA);
    let mut decoder = JpegDecoder::new_with_options(ZCursor::new(data), options);

    // Headers only: the frame size is checked before any pixel memory is allocated.
    decoder.decode_headers().map_err(decode_error)?;
    let (w, h) = decoder.dimensions().ok_or_else(|| ConvertError::Decode {
        encoding: "MJPEG",
        message: "missing frame header".to_string(),
    })?;
    let got_width = u32::try_from(w).unwrap_or(u32::MAX);
    let got_height = u32::try_from(h).unwrap_or(u32::MAX);
    if got_width != width || got_height != height {
        return Err(ConvertError::GeometryMismatch {
            width,
            height,
            got_width,
            got_height,
        });
    }

    let decoded = decoder.decode().map_err(decode_error)?;

    let expected = usize::try_from(u64::from(width) * u64::from(height) * 4).map_err(|_| {
        ConvertError::Decode {
            encoding: "MJPEG",
            message: "dimensions do not fit usize".to_string(),
        }
    })?;
    if decoded.len() < expected {
        return Err(ConvertError::PayloadTooSmall {
            encoding: "MJPEG",
            got: decoded.len(),
            expected,
        });
    }

    rgba.copy_from_slice(&decoded[..expected]);
    Ok(())
}
