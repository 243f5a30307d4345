//! The event sink driven by the decoder.

use super::types::descriptor::Descriptor;
use super::types::models::{
    ChannelId, ColorModeData, FileHeader, FrameInformation, ImageData, ImageResource,
    LayerRecord, LayersInformation, SlicesData,
};

/// Receives one callback per parsed item, in on-disk order.
///
/// All methods have no-op defaults, so a delegate implements only the
/// events it cares about. Payloads the decoder no longer needs are
/// moved into the callback; payloads it still owns (the header, layer
/// records bracketing their channel data, scanline buffers) are passed
/// by reference.
///
/// For one successful decode the delegate sees: exactly one
/// [`on_file_header`](Self::on_file_header), at most one
/// [`on_color_mode_data`](Self::on_color_mode_data), zero or more
/// [`on_image_resource`](Self::on_image_resource) (with
/// [`on_slices_data`](Self::on_slices_data) and
/// [`on_frames_data`](Self::on_frames_data) interleaved where those
/// resources occur), per-layer begin/image/end sequences, exactly one
/// [`on_layers_and_mask`](Self::on_layers_and_mask), and one composite
/// image bracketed by begin/end with its scanlines.
pub trait DecoderDelegate {
    fn on_file_header(&mut self, header: &FileHeader) {
        let _ = header;
    }

    fn on_color_mode_data(&mut self, data: ColorModeData) {
        let _ = data;
    }

    fn on_image_resource(&mut self, resource: ImageResource) {
        let _ = resource;
    }

    /// Emitted when a slice resource (id 1050) is parsed, before its
    /// `on_image_resource` event.
    fn on_slices_data(&mut self, slices: &SlicesData) {
        let _ = slices;
    }

    /// Emitted when the animation resource (id 4003) is parsed, before
    /// its `on_image_resource` event.
    fn on_frames_data(&mut self, frames: &[FrameInformation], active_frame_index: u32) {
        let _ = (frames, active_frame_index);
    }

    /// Emitted when a per-layer timeline (`tmln`) descriptor is parsed.
    fn on_layer_timeline(&mut self, layer: &LayerRecord, timeline: &Descriptor) {
        let _ = (layer, timeline);
    }

    fn on_begin_layer(&mut self, layer: &LayerRecord) {
        let _ = layer;
    }

    fn on_end_layer(&mut self, layer: &LayerRecord) {
        let _ = layer;
    }

    fn on_layers_and_mask(&mut self, layers: LayersInformation) {
        let _ = layers;
    }

    /// Emitted once for the composite image, after its pixel events.
    fn on_image_data(&mut self, image: &ImageData) {
        let _ = image;
    }

    fn on_begin_image(&mut self, image: &ImageData) {
        let _ = image;
    }

    /// One decoded scanline of one channel. `data` is only valid for
    /// the duration of the call.
    fn on_image_scanline(&mut self, image: &ImageData, y: u32, channel_id: ChannelId, data: &[u8]) {
        let _ = (image, y, channel_id, data);
    }

    fn on_end_image(&mut self, image: &ImageData) {
        let _ = image;
    }
}

/// A delegate that ignores every event. Useful for validating a file's
/// structure without consuming its contents.
#[derive(Debug, Default)]
pub struct NullDelegate;

impl DecoderDelegate for NullDelegate {}
