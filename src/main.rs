use std::fs::File;
use std::process::ExitCode;

use psd_reader::types::models::{
    ChannelId, ColorModeData, FileHeader, FrameInformation, ImageData, ImageResource,
    LayerRecord, LayersInformation, ResourcePayload, SlicesData,
};
use psd_reader::{decode_psd, DecoderDelegate};

/// Prints one line per decoder event. A quick way to inspect what a
/// file actually contains.
#[derive(Default)]
struct ContentPrinter {
    scanlines: usize,
}

impl DecoderDelegate for ContentPrinter {
    fn on_file_header(&mut self, header: &FileHeader) {
        println!(
            "header: {:?} {}x{} depth={} {:?} channels={}",
            header.version,
            header.width,
            header.height,
            header.depth,
            header.color_mode,
            header.nchannels
        );
    }

    fn on_color_mode_data(&mut self, data: ColorModeData) {
        match data {
            ColorModeData::Indexed(colors) => println!("palette: {} entries", colors.len()),
            ColorModeData::Duotone(raw) => println!("duotone data: {} bytes", raw.len()),
        }
    }

    fn on_image_resource(&mut self, resource: ImageResource) {
        let summary = match &resource.payload {
            ResourcePayload::Descriptor(desc) => {
                format!("descriptor '{}' with {} fields", desc.class_id, desc.fields.len())
            }
            ResourcePayload::Slices(slices) => format!("{} slices", slices.slices.len()),
            ResourcePayload::Frames { frames, .. } => format!("{} frames", frames.len()),
            ResourcePayload::Raw(raw) => format!("{} raw bytes", raw.len()),
            ResourcePayload::Empty => "empty".to_string(),
        };
        let description = ImageResource::id_description(resource.resource_id);
        println!(
            "resource {} {description:?} '{}': {summary}",
            resource.resource_id, resource.name
        );
    }

    fn on_slices_data(&mut self, slices: &SlicesData) {
        println!(
            "slices '{}': {} slices",
            slices.group_name,
            slices.slices.len()
        );
    }

    fn on_frames_data(&mut self, frames: &[FrameInformation], active_frame_index: u32) {
        println!("animation: {} frames, active {active_frame_index}", frames.len());
        for frame in frames {
            println!("  frame {} duration={}", frame.id, frame.duration);
        }
    }

    fn on_begin_layer(&mut self, layer: &LayerRecord) {
        println!(
            "layer '{}' ({}x{}, {:?}, {} channels)",
            layer.name,
            layer.width(),
            layer.height(),
            layer.blend_mode,
            layer.channels.len()
        );
        self.scanlines = 0;
    }

    fn on_end_layer(&mut self, _layer: &LayerRecord) {
        println!("  {} scanlines", self.scanlines);
    }

    fn on_layers_and_mask(&mut self, layers: LayersInformation) {
        println!("layers and mask: {} layers", layers.layers.len());
    }

    fn on_image_scanline(
        &mut self,
        _image: &ImageData,
        _y: u32,
        _channel_id: ChannelId,
        _data: &[u8],
    ) {
        self.scanlines += 1;
    }

    fn on_image_data(&mut self, image: &ImageData) {
        println!(
            "composite: {:?}, {} channels, {} scanlines",
            image.compression,
            image.channels.len(),
            self.scanlines
        );
    }
}

fn main() -> ExitCode {
    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: psd-reader <file.psd>");
        return ExitCode::FAILURE;
    };

    let file = match File::open(&path) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("failed to open {path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    match decode_psd(file, &mut ContentPrinter::default()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("decode failed: {err}");
            ExitCode::FAILURE
        }
    }
}
