use super::{Arc, ImageBuffer, ImageFrame, RenderImage, Rgba};
use crate::pipeline::VideoImage;

pub(super) fn frame_to_image(video: VideoImage) -> Option<Arc<RenderImage>> {
    let VideoImage {
        mut rgba,
        width,
        height,
        ..
    } = video;

    // GPUI expects BGRA; convert in place to avoid the async asset pipeline and flicker.
    for px in rgba.chunks_exact_mut(4) {
        px.swap(0, 2);
    }

    let buffer = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(width, height, rgba)?;
    let frame = ImageFrame::new(buffer);

    Some(Arc::new(RenderImage::new(vec![frame])))
}
