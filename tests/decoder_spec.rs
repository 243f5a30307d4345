//! Decoder tests over synthetic in-memory files.
//!
//! Fixtures are built with the little writer helpers below rather than
//! checked-in binaries, so every byte a test depends on is visible next
//! to its assertions.

use std::io::Cursor;

use psd_reader::psd::format::descriptor::DESCRIPTOR_VERSION;
use psd_reader::types::models::{
    ChannelId, ColorMode, ColorModeData, FileHeader, FrameInformation, ImageData, ImageResource,
    LayersInformation, ResourcePayload, SectionType, SlicesData, Version,
};
use psd_reader::{decode_psd, Decoder, DecoderDelegate, PsdError, PsdReader};

const PSD: u16 = 1;
const PSB: u16 = 2;

// --- fixture writers -----------------------------------------------------

fn put_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn put_i16(buf: &mut Vec<u8>, v: i16) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn put_i32(buf: &mut Vec<u8>, v: i32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn put_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn put_f64(buf: &mut Vec<u8>, v: f64) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn put_fourcc(buf: &mut Vec<u8>, code: &[u8; 4]) {
    buf.extend_from_slice(code);
}

/// Section length that is 4 bytes in PSD fixtures and 8 in PSB ones.
fn put_len(buf: &mut Vec<u8>, version: u16, v: u64) {
    if version == PSB {
        put_u64(buf, v);
    } else {
        put_u32(buf, v as u32);
    }
}

fn put_pascal(buf: &mut Vec<u8>, name: &str, alignment: usize) {
    buf.push(name.len() as u8);
    buf.extend_from_slice(name.as_bytes());
    let mut total = 1 + name.len();
    while total % alignment != 0 {
        buf.push(0);
        total += 1;
    }
}

fn put_unicode(buf: &mut Vec<u8>, s: &str) {
    let units: Vec<u16> = s.encode_utf16().collect();
    put_u32(buf, units.len() as u32);
    for unit in units {
        put_u16(buf, unit);
    }
}

/// Descriptor key: zero length plus four bytes for 4-character keys,
/// length-prefixed ASCII otherwise.
fn put_key(buf: &mut Vec<u8>, key: &str) {
    if key.len() == 4 {
        put_u32(buf, 0);
        buf.extend_from_slice(key.as_bytes());
    } else {
        put_u32(buf, key.len() as u32);
        buf.extend_from_slice(key.as_bytes());
    }
}

fn put_long_field(buf: &mut Vec<u8>, key: &str, v: i32) {
    put_key(buf, key);
    put_fourcc(buf, b"long");
    put_i32(buf, v);
}

fn put_double_field(buf: &mut Vec<u8>, key: &str, v: f64) {
    put_key(buf, key);
    put_fourcc(buf, b"doub");
    put_f64(buf, v);
}

fn put_bool_field(buf: &mut Vec<u8>, key: &str, v: bool) {
    put_key(buf, key);
    put_fourcc(buf, b"bool");
    buf.push(v as u8);
}

fn put_text_field(buf: &mut Vec<u8>, key: &str, v: &str) {
    put_key(buf, key);
    put_fourcc(buf, b"TEXT");
    put_unicode(buf, v);
}

/// Descriptor prologue: empty name, class id, field count.
fn put_descriptor_head(buf: &mut Vec<u8>, class_id: &str, count: u32) {
    put_unicode(buf, "");
    put_key(buf, class_id);
    put_u32(buf, count);
}

fn file_header(
    version: u16,
    nchannels: u16,
    width: u32,
    height: u32,
    depth: u16,
    color_mode: u16,
) -> Vec<u8> {
    let mut buf = Vec::new();
    put_fourcc(&mut buf, b"8BPS");
    put_u16(&mut buf, version);
    buf.extend_from_slice(&[0u8; 6]);
    put_u16(&mut buf, nchannels);
    put_u32(&mut buf, height);
    put_u32(&mut buf, width);
    put_u16(&mut buf, depth);
    put_u16(&mut buf, color_mode);
    buf
}

fn empty_color_mode(buf: &mut Vec<u8>) {
    put_u32(buf, 0);
}

fn empty_resources(buf: &mut Vec<u8>) {
    put_u32(buf, 0);
}

fn empty_layers(buf: &mut Vec<u8>, version: u16) {
    put_len(buf, version, 0);
}

fn composite_raw(buf: &mut Vec<u8>, data: &[u8]) {
    put_u16(buf, 0);
    buf.extend_from_slice(data);
}

fn resource_block(id: u16, name: &str, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    put_fourcc(&mut buf, b"8BIM");
    put_u16(&mut buf, id);
    put_pascal(&mut buf, name, 2);
    put_u32(&mut buf, payload.len() as u32);
    buf.extend_from_slice(payload);
    if payload.len() % 2 == 1 {
        buf.push(0);
    }
    buf
}

fn resources_section(blocks: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();
    let total: usize = blocks.iter().map(Vec::len).sum();
    put_u32(&mut buf, total as u32);
    for block in blocks {
        buf.extend_from_slice(block);
    }
    buf
}

/// Additional-layer-info tagged block with a 4-byte length field.
fn tagged_block(signature: &[u8; 4], key: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    put_fourcc(&mut buf, signature);
    put_fourcc(&mut buf, key);
    put_u32(&mut buf, payload.len() as u32);
    buf.extend_from_slice(payload);
    if payload.len() % 2 == 1 {
        buf.push(0);
    }
    buf
}

struct LayerFx {
    name: &'static str,
    /// (top, left, bottom, right)
    bounds: (i32, i32, i32, i32),
    /// Channel id plus channel data, compression marker included.
    channels: Vec<(i16, Vec<u8>)>,
    extra_blocks: Vec<u8>,
}

impl LayerFx {
    fn new(name: &'static str, bounds: (i32, i32, i32, i32)) -> Self {
        Self {
            name,
            bounds,
            channels: Vec::new(),
            extra_blocks: Vec::new(),
        }
    }

    fn channel(mut self, id: i16, pixel_data: &[u8]) -> Self {
        let mut data = Vec::new();
        put_u16(&mut data, 0); // raw compression
        data.extend_from_slice(pixel_data);
        self.channels.push((id, data));
        self
    }

    fn extra(mut self, block: Vec<u8>) -> Self {
        self.extra_blocks.extend_from_slice(&block);
        self
    }
}

fn layer_record(version: u16, layer: &LayerFx) -> Vec<u8> {
    let mut buf = Vec::new();
    put_i32(&mut buf, layer.bounds.0);
    put_i32(&mut buf, layer.bounds.1);
    put_i32(&mut buf, layer.bounds.2);
    put_i32(&mut buf, layer.bounds.3);

    put_u16(&mut buf, layer.channels.len() as u16);
    for (id, data) in &layer.channels {
        put_i16(&mut buf, *id);
        put_len(&mut buf, version, data.len() as u64);
    }

    put_fourcc(&mut buf, b"8BIM");
    put_fourcc(&mut buf, b"norm");
    buf.push(255); // opacity
    buf.push(0); // clipping
    buf.push(0); // flags
    buf.push(0); // filler

    let mut extra = Vec::new();
    put_u32(&mut extra, 0); // mask data
    put_u32(&mut extra, 0); // blending ranges
    put_pascal(&mut extra, layer.name, 4);
    extra.extend_from_slice(&layer.extra_blocks);

    put_u32(&mut buf, extra.len() as u32);
    buf.extend_from_slice(&extra);
    buf
}

/// Layers-and-mask section: outer length, layers-info block (count,
/// records, channel data), empty global mask info.
fn layers_section(version: u16, layer_count: i16, layers: &[LayerFx]) -> Vec<u8> {
    let mut info = Vec::new();
    put_i16(&mut info, layer_count);
    for layer in layers {
        info.extend_from_slice(&layer_record(version, layer));
    }
    for layer in layers {
        for (_, data) in &layer.channels {
            info.extend_from_slice(data);
        }
    }

    let mut body = Vec::new();
    put_len(&mut body, version, info.len() as u64);
    body.extend_from_slice(&info);
    put_u32(&mut body, 0); // global mask info

    let mut buf = Vec::new();
    put_len(&mut buf, version, body.len() as u64);
    buf.extend_from_slice(&body);
    buf
}

// --- recording delegate --------------------------------------------------

#[derive(Default)]
struct Recording {
    header: Option<FileHeader>,
    color_mode: Option<ColorModeData>,
    resources: Vec<ImageResource>,
    slices: Vec<SlicesData>,
    frames: Vec<(Vec<FrameInformation>, u32)>,
    layers: Option<LayersInformation>,
    begin_layers: Vec<String>,
    end_layers: Vec<String>,
    scanlines: Vec<(ChannelId, u32, Vec<u8>)>,
    composite: Option<ImageData>,
    begin_images: usize,
    end_images: usize,
}

impl DecoderDelegate for Recording {
    fn on_file_header(&mut self, header: &FileHeader) {
        self.header = Some(*header);
    }

    fn on_color_mode_data(&mut self, data: ColorModeData) {
        assert!(self.color_mode.is_none(), "color mode emitted twice");
        self.color_mode = Some(data);
    }

    fn on_image_resource(&mut self, resource: ImageResource) {
        self.resources.push(resource);
    }

    fn on_slices_data(&mut self, slices: &SlicesData) {
        self.slices.push(slices.clone());
    }

    fn on_frames_data(&mut self, frames: &[FrameInformation], active_frame_index: u32) {
        self.frames.push((frames.to_vec(), active_frame_index));
    }

    fn on_begin_layer(&mut self, layer: &psd_reader::types::models::LayerRecord) {
        self.begin_layers.push(layer.name.clone());
    }

    fn on_end_layer(&mut self, layer: &psd_reader::types::models::LayerRecord) {
        self.end_layers.push(layer.name.clone());
    }

    fn on_layers_and_mask(&mut self, layers: LayersInformation) {
        assert!(self.layers.is_none(), "layers and mask emitted twice");
        self.layers = Some(layers);
    }

    fn on_image_data(&mut self, image: &ImageData) {
        self.composite = Some(image.clone());
    }

    fn on_begin_image(&mut self, _image: &ImageData) {
        self.begin_images += 1;
    }

    fn on_image_scanline(&mut self, _image: &ImageData, y: u32, channel_id: ChannelId, data: &[u8]) {
        self.scanlines.push((channel_id, y, data.to_vec()));
    }

    fn on_end_image(&mut self, _image: &ImageData) {
        self.end_images += 1;
    }
}

fn decode_ok(bytes: Vec<u8>) -> Recording {
    let mut recording = Recording::default();
    decode_psd(Cursor::new(bytes), &mut recording).expect("decode");
    recording
}

// --- scenarios -----------------------------------------------------------

#[test]
fn minimal_rgb_composite() {
    let mut file = file_header(PSD, 3, 1, 1, 8, ColorMode::Rgb as u16);
    empty_color_mode(&mut file);
    empty_resources(&mut file);
    empty_layers(&mut file, PSD);
    composite_raw(&mut file, &[0xAA, 0xBB, 0xCC]);

    let rec = decode_ok(file);
    let header = rec.header.expect("header event");
    assert_eq!(header.version, Version::Psd);
    assert_eq!((header.width, header.height), (1, 1));
    assert_eq!(header.color_mode, ColorMode::Rgb);

    assert!(rec.color_mode.is_none());
    assert!(rec.resources.is_empty());
    assert_eq!(rec.layers.expect("layers event").layers.len(), 0);

    assert_eq!(
        rec.scanlines,
        vec![
            (ChannelId::Red, 0, vec![0xAA]),
            (ChannelId::Green, 0, vec![0xBB]),
            (ChannelId::Blue, 0, vec![0xCC]),
        ]
    );
    let composite = rec.composite.expect("composite event");
    assert_eq!(
        composite.channels,
        vec![ChannelId::Red, ChannelId::Green, ChannelId::Blue]
    );
    assert_eq!(rec.begin_images, 1);
    assert_eq!(rec.end_images, 1);
}

#[test]
fn indexed_palette_roundtrip() {
    let mut file = file_header(PSD, 1, 1, 1, 8, ColorMode::Indexed as u16);
    put_u32(&mut file, 768);
    for i in 0..=255u8 {
        file.push(i);
    }
    for i in 0..=255u8 {
        file.push(255 - i);
    }
    for i in 0..=255u8 {
        file.push(i ^ 0x55);
    }
    empty_resources(&mut file);
    empty_layers(&mut file, PSD);
    composite_raw(&mut file, &[0x00]);

    let rec = decode_ok(file);
    let ColorModeData::Indexed(colors) = rec.color_mode.expect("color mode event") else {
        panic!("expected indexed palette");
    };
    assert_eq!(colors.len(), 256);
    for (i, color) in colors.iter().enumerate() {
        assert_eq!(color.r, i as u8);
        assert_eq!(color.g, 255 - i as u8);
        assert_eq!(color.b, i as u8 ^ 0x55);
    }
}

#[test]
fn indexed_palette_wrong_length_rejected() {
    let mut file = file_header(PSD, 1, 1, 1, 8, ColorMode::Indexed as u16);
    put_u32(&mut file, 512);
    file.extend_from_slice(&[0u8; 512]);

    let err = decode_psd(Cursor::new(file), &mut Recording::default()).unwrap_err();
    assert!(matches!(err, PsdError::InvalidFormat(_)), "got {err:?}");
}

#[test]
fn rle_single_scanline() {
    let mut file = file_header(PSD, 1, 5, 1, 8, ColorMode::Grayscale as u16);
    empty_color_mode(&mut file);
    empty_resources(&mut file);
    empty_layers(&mut file, PSD);
    put_u16(&mut file, 1); // RLE
    put_u16(&mut file, 6); // one scanline byte count
    file.extend_from_slice(&[0x02, 0x01, 0x02, 0x03, 0xFE, 0x04]);

    let rec = decode_ok(file);
    // Width 5 at depth 8 pads the scanline buffer to 6 bytes.
    assert_eq!(
        rec.scanlines,
        vec![(ChannelId::Alpha, 0, vec![0x01, 0x02, 0x03, 0x04, 0x04, 0x04])]
    );
}

#[test]
fn rle_consumes_declared_byte_counts() {
    // Width 2, height 3: the three scanlines exercise the zero-fill
    // rule, a repeat run truncated by a full buffer, and a literal run
    // truncated by a full buffer. Every declared opcode byte must be
    // consumed, which the final cursor position proves.
    let mut file = file_header(PSD, 1, 2, 3, 8, ColorMode::Grayscale as u16);
    empty_color_mode(&mut file);
    empty_resources(&mut file);
    empty_layers(&mut file, PSD);
    put_u16(&mut file, 1); // RLE
    put_u16(&mut file, 2); // line 0
    put_u16(&mut file, 3); // line 1
    put_u16(&mut file, 5); // line 2
    file.extend_from_slice(&[0x00, 0x11]); // line 0: one literal, zero-fill
    file.extend_from_slice(&[0xFE, 0x22, 0x80]); // line 1: repeat 3 into 2, no-op
    file.extend_from_slice(&[0x03, 0x31, 0x32, 0x33, 0x34]); // line 2: literal 4 into 2

    let total_len = file.len() as u64;
    let mut rec = Recording::default();
    let mut decoder = Decoder::new(Cursor::new(file));
    decoder.decode(&mut rec).expect("decode");

    assert_eq!(
        rec.scanlines,
        vec![
            (ChannelId::Alpha, 0, vec![0x11, 0x00]),
            (ChannelId::Alpha, 1, vec![0x22, 0x22]),
            (ChannelId::Alpha, 2, vec![0x31, 0x32]),
        ]
    );
    assert_eq!(decoder.into_inner().position(), total_len);
}

fn animation_payload() -> Vec<u8> {
    let mut payload = Vec::new();
    put_u32(&mut payload, 0);
    put_u32(&mut payload, 0);
    put_u32(&mut payload, 0);
    put_fourcc(&mut payload, b"8BIM");
    put_fourcc(&mut payload, b"AnDs");

    let mut desc = Vec::new();
    put_u32(&mut desc, DESCRIPTOR_VERSION);
    put_descriptor_head(&mut desc, "null", 2);

    put_key(&mut desc, "FrIn");
    put_fourcc(&mut desc, b"VlLs");
    put_u32(&mut desc, 2);
    for (duration, id, ga) in [(100, 1, 0.5), (50, 2, 0.75)] {
        put_fourcc(&mut desc, b"Objc");
        put_descriptor_head(&mut desc, "null", 3);
        put_long_field(&mut desc, "FrDl", duration);
        put_long_field(&mut desc, "FrID", id);
        put_double_field(&mut desc, "FrGA", ga);
    }

    put_key(&mut desc, "FSts");
    put_fourcc(&mut desc, b"VlLs");
    put_u32(&mut desc, 1);
    put_fourcc(&mut desc, b"Objc");
    put_descriptor_head(&mut desc, "null", 1);
    put_long_field(&mut desc, "AFrm", 1);

    put_u32(&mut payload, desc.len() as u32);
    payload.extend_from_slice(&desc);
    payload
}

#[test]
fn animation_resource_frames() {
    let mut file = file_header(PSD, 1, 1, 1, 8, ColorMode::Grayscale as u16);
    empty_color_mode(&mut file);
    let blocks = vec![resource_block(4003, "", &animation_payload())];
    file.extend_from_slice(&resources_section(&blocks));
    empty_layers(&mut file, PSD);
    composite_raw(&mut file, &[0x00]);

    let rec = decode_ok(file);
    let (frames, active) = &rec.frames[0];
    assert_eq!(*active, 1);
    assert_eq!(
        frames.as_slice(),
        &[
            FrameInformation {
                id: 1,
                duration: 100,
                ga: 0.5
            },
            FrameInformation {
                id: 2,
                duration: 50,
                ga: 0.75
            },
        ]
    );

    assert_eq!(rec.resources.len(), 1);
    assert!(matches!(
        rec.resources[0].payload,
        ResourcePayload::Frames { .. }
    ));
}

fn two_layer_file(version: u16) -> Vec<u8> {
    let mut file = file_header(version, 1, 1, 1, 8, ColorMode::Grayscale as u16);
    empty_color_mode(&mut file);
    empty_resources(&mut file);
    let layers = vec![
        LayerFx::new("bottom", (0, 0, 1, 1)).channel(0, &[0x10]),
        LayerFx::new("top", (0, 0, 1, 1)).channel(0, &[0x20]),
    ];
    file.extend_from_slice(&layers_section(version, 2, &layers));
    composite_raw(&mut file, &[0x00]);
    file
}

#[test]
fn psb_layers_match_psd() {
    let psd_rec = decode_ok(two_layer_file(PSD));
    let psb_rec = decode_ok(two_layer_file(PSB));

    for rec in [&psd_rec, &psb_rec] {
        let layers = rec.layers.as_ref().expect("layers event");
        assert_eq!(layers.layers.len(), 2);
        assert_eq!(layers.layers[0].name, "bottom");
        assert_eq!(layers.layers[1].name, "top");
        assert!(!layers.first_channel_is_transparency);
        assert_eq!(rec.begin_layers, vec!["bottom", "top"]);
        assert_eq!(rec.end_layers, vec!["bottom", "top"]);
    }
    assert_eq!(psd_rec.header.unwrap().version, Version::Psd);
    assert_eq!(psb_rec.header.unwrap().version, Version::Psb);
}

#[test]
fn negative_layer_count_sets_transparency_flag() {
    let mut file = file_header(PSD, 1, 1, 1, 8, ColorMode::Grayscale as u16);
    empty_color_mode(&mut file);
    empty_resources(&mut file);
    let layers = vec![
        LayerFx::new("a", (0, 0, 1, 1)).channel(0, &[0x01]),
        LayerFx::new("b", (0, 0, 1, 1)).channel(0, &[0x02]),
    ];
    file.extend_from_slice(&layers_section(PSD, -2, &layers));
    composite_raw(&mut file, &[0x00]);

    let rec = decode_ok(file);
    let layers = rec.layers.expect("layers event");
    assert_eq!(layers.layers.len(), 2);
    assert!(layers.first_channel_is_transparency);
    // Layer channel data parsed in place: no spurious merged
    // transparency read shifted the scanlines.
    assert_eq!(rec.scanlines[0], (ChannelId::Red, 0, vec![0x01]));
    assert_eq!(rec.scanlines[1], (ChannelId::Red, 0, vec![0x02]));
}

// --- boundaries ----------------------------------------------------------

#[test]
fn dimension_ceilings_per_version() {
    // 30000 wide PSD decodes.
    let mut file = file_header(PSD, 1, 30_000, 1, 8, ColorMode::Grayscale as u16);
    empty_color_mode(&mut file);
    empty_resources(&mut file);
    empty_layers(&mut file, PSD);
    composite_raw(&mut file, &vec![0u8; 30_000]);
    decode_ok(file);

    // One over is rejected for PSD.
    let over = file_header(PSD, 1, 30_001, 1, 8, ColorMode::Grayscale as u16);
    let err = decode_psd(Cursor::new(over), &mut Recording::default()).unwrap_err();
    assert!(matches!(err, PsdError::DimensionsOutOfRange { .. }));

    // The same width is fine in a PSB, whose ceiling is 300000.
    let mut psb = file_header(PSB, 1, 30_001, 1, 8, ColorMode::Grayscale as u16);
    empty_color_mode(&mut psb);
    empty_resources(&mut psb);
    empty_layers(&mut psb, PSB);
    composite_raw(&mut psb, &vec![0u8; 30_001]);
    decode_ok(psb);

    let over_psb = file_header(PSB, 1, 300_001, 1, 8, ColorMode::Grayscale as u16);
    let err = decode_psd(Cursor::new(over_psb), &mut Recording::default()).unwrap_err();
    assert!(matches!(err, PsdError::DimensionsOutOfRange { .. }));
}

#[test]
fn header_validation() {
    let cases: &[(Vec<u8>, fn(&PsdError) -> bool)] = &[
        (
            {
                let mut h = file_header(PSD, 1, 1, 1, 8, 1);
                h[0] = b'X';
                h
            },
            |e| matches!(e, PsdError::BadSignature { .. }),
        ),
        (file_header(3, 1, 1, 1, 8, 1), |e| {
            matches!(e, PsdError::UnsupportedVersion(3))
        }),
        (file_header(PSD, 0, 1, 1, 8, 1), |e| {
            matches!(e, PsdError::ChannelCountOutOfRange(0))
        }),
        (file_header(PSD, 57, 1, 1, 8, 1), |e| {
            matches!(e, PsdError::ChannelCountOutOfRange(57))
        }),
        (file_header(PSD, 1, 1, 1, 12, 1), |e| {
            matches!(e, PsdError::UnsupportedDepth(12))
        }),
        (file_header(PSD, 1, 1, 1, 8, 5), |e| {
            matches!(e, PsdError::InvalidColorMode(5))
        }),
        (file_header(PSD, 1, 0, 1, 8, 1), |e| {
            matches!(e, PsdError::DimensionsOutOfRange { .. })
        }),
    ];

    for (bytes, check) in cases {
        let err = decode_psd(Cursor::new(bytes.clone()), &mut Recording::default()).unwrap_err();
        assert!(check(&err), "unexpected error: {err:?}");
    }
}

#[test]
fn resources_resync_after_unknown_payload() {
    // An odd-length unknown resource (padded on disk) followed by a
    // second resource. The parser must land exactly on the second
    // record's signature.
    let mut file = file_header(PSD, 1, 1, 1, 8, ColorMode::Grayscale as u16);
    empty_color_mode(&mut file);
    let blocks = vec![
        resource_block(1036, "thumb", &[1, 2, 3, 4, 5]),
        resource_block(1037, "", &[9, 9]),
    ];
    file.extend_from_slice(&resources_section(&blocks));
    empty_layers(&mut file, PSD);
    composite_raw(&mut file, &[0x00]);

    let rec = decode_ok(file);
    assert_eq!(rec.resources.len(), 2);
    assert_eq!(rec.resources[0].resource_id, 1036);
    assert_eq!(rec.resources[0].name, "thumb");
    assert!(matches!(
        &rec.resources[0].payload,
        ResourcePayload::Raw(raw) if raw == &[1, 2, 3, 4, 5]
    ));
    assert_eq!(rec.resources[1].resource_id, 1037);
}

// --- slices --------------------------------------------------------------

fn slices_v6_payload() -> Vec<u8> {
    let mut p = Vec::new();
    put_u32(&mut p, 6);
    for v in [0, 0, 64, 128] {
        put_i32(&mut p, v); // top, left, bottom, right
    }
    put_unicode(&mut p, "hero");
    put_u32(&mut p, 1);

    put_u32(&mut p, 11); // slice id
    put_u32(&mut p, 3); // group id
    put_u32(&mut p, 0); // origin
    put_unicode(&mut p, "slice-name");
    put_u32(&mut p, 2); // type
    for v in [8, 4, 72, 60] {
        put_i32(&mut p, v); // left, top, right, bottom
    }
    put_unicode(&mut p, "https://example.com");
    put_unicode(&mut p, "_blank");
    put_unicode(&mut p, "hello");
    put_unicode(&mut p, "alt text");
    p.push(1); // cell text is HTML
    put_unicode(&mut p, "<b>cell</b>");
    put_u32(&mut p, 0); // horizontal alignment
    put_u32(&mut p, 0); // vertical alignment
    p.extend_from_slice(&[0xFF, 0x10, 0x20, 0x30]); // aRGB color
    p
}

#[test]
fn slices_v6() {
    let mut file = file_header(PSD, 1, 200, 100, 8, ColorMode::Grayscale as u16);
    empty_color_mode(&mut file);
    let blocks = vec![resource_block(1050, "", &slices_v6_payload())];
    file.extend_from_slice(&resources_section(&blocks));
    empty_layers(&mut file, PSD);
    composite_raw(&mut file, &vec![0u8; 200 * 100]);

    let rec = decode_ok(file);
    assert_eq!(rec.slices.len(), 1);
    let slices = &rec.slices[0];
    assert_eq!(slices.group_name, "hero");
    assert_eq!((slices.bounds.bottom, slices.bounds.right), (64, 128));
    assert_eq!(slices.slices.len(), 1);

    let slice = &slices.slices[0];
    assert_eq!(slice.slice_id, 11);
    assert_eq!(slice.group_id, 3);
    assert_eq!(
        (
            slice.bounds.left,
            slice.bounds.top,
            slice.bounds.right,
            slice.bounds.bottom
        ),
        (8, 4, 72, 60)
    );
    assert_eq!(slice.url, "https://example.com");
    assert_eq!(slice.message, "hello");
    assert_eq!(slice.alt_tag, "alt text");
    assert!(slice.cell_text_is_html);
    assert_eq!(slice.cell_text, "<b>cell</b>");
}

fn slices_v7_payload() -> Vec<u8> {
    let mut p = Vec::new();
    put_u32(&mut p, 7);
    put_u32(&mut p, DESCRIPTOR_VERSION);
    put_descriptor_head(&mut p, "null", 3);

    put_key(&mut p, "bounds");
    put_fourcc(&mut p, b"Objc");
    put_descriptor_head(&mut p, "Rctn", 4);
    put_long_field(&mut p, "Top ", 0);
    put_long_field(&mut p, "Left", 0);
    put_long_field(&mut p, "Btom", 64);
    put_long_field(&mut p, "Rght", 128);

    put_text_field(&mut p, "baseName", "hero");

    put_key(&mut p, "slices");
    put_fourcc(&mut p, b"VlLs");
    put_u32(&mut p, 1);
    put_fourcc(&mut p, b"Objc");
    put_descriptor_head(&mut p, "slice", 8);
    put_long_field(&mut p, "sliceID", 11);
    put_long_field(&mut p, "groupID", 3);
    put_key(&mut p, "bounds");
    put_fourcc(&mut p, b"Objc");
    put_descriptor_head(&mut p, "Rctn", 4);
    put_long_field(&mut p, "Top ", 4);
    put_long_field(&mut p, "Left", 8);
    put_long_field(&mut p, "Btom", 60);
    put_long_field(&mut p, "Rght", 72);
    put_text_field(&mut p, "url", "https://example.com");
    put_text_field(&mut p, "Msge", "hello");
    put_text_field(&mut p, "altTag", "alt text");
    put_text_field(&mut p, "cellText", "<b>cell</b>");
    put_bool_field(&mut p, "cellTextIsHTML", true);
    p
}

#[test]
fn slices_v7_descriptor() {
    let mut file = file_header(PSD, 1, 200, 100, 8, ColorMode::Grayscale as u16);
    empty_color_mode(&mut file);
    let blocks = vec![resource_block(1050, "", &slices_v7_payload())];
    file.extend_from_slice(&resources_section(&blocks));
    empty_layers(&mut file, PSD);
    composite_raw(&mut file, &vec![0u8; 200 * 100]);

    let rec = decode_ok(file);
    let slices = &rec.slices[0];
    assert_eq!(slices.group_name, "hero");
    assert_eq!((slices.bounds.bottom, slices.bounds.right), (64, 128));

    let slice = &slices.slices[0];
    assert_eq!(slice.slice_id, 11);
    assert_eq!(slice.group_id, 3);
    assert_eq!(
        (
            slice.bounds.top,
            slice.bounds.left,
            slice.bounds.bottom,
            slice.bounds.right
        ),
        (4, 8, 60, 72)
    );
    assert_eq!(slice.url, "https://example.com");
    assert_eq!(slice.message, "hello");
    assert!(slice.cell_text_is_html);
}

#[test]
fn slices_descriptor_version_mismatch_is_skipped() {
    // A v7 slice resource whose descriptor version is not 16. The
    // decode must carry on: no slices event, an empty payload, and the
    // following resource still lands on its signature.
    let mut payload = Vec::new();
    put_u32(&mut payload, 7);
    put_u32(&mut payload, 6); // not a descriptor version we know
    payload.extend_from_slice(&[0xAB; 6]);

    let mut file = file_header(PSD, 1, 1, 1, 8, ColorMode::Grayscale as u16);
    empty_color_mode(&mut file);
    let blocks = vec![
        resource_block(1050, "", &payload),
        resource_block(1037, "", &[9, 9]),
    ];
    file.extend_from_slice(&resources_section(&blocks));
    empty_layers(&mut file, PSD);
    composite_raw(&mut file, &[0x00]);

    let rec = decode_ok(file);
    assert!(rec.slices.is_empty());
    assert_eq!(rec.resources.len(), 2);
    assert!(matches!(rec.resources[0].payload, ResourcePayload::Empty));
    assert_eq!(rec.resources[1].resource_id, 1037);
    assert_eq!(rec.scanlines.len(), 1);
}

// --- tagged blocks -------------------------------------------------------

fn mlst_metadata_item() -> Vec<u8> {
    let mut desc = Vec::new();
    put_u32(&mut desc, DESCRIPTOR_VERSION);
    put_descriptor_head(&mut desc, "null", 2);
    put_long_field(&mut desc, "LaID", 7);
    put_key(&mut desc, "LaSt");
    put_fourcc(&mut desc, b"VlLs");
    put_u32(&mut desc, 1);
    put_fourcc(&mut desc, b"Objc");
    put_descriptor_head(&mut desc, "null", 2);
    put_bool_field(&mut desc, "enab", false);
    put_key(&mut desc, "FrLs");
    put_fourcc(&mut desc, b"VlLs");
    put_u32(&mut desc, 2);
    put_fourcc(&mut desc, b"long");
    put_i32(&mut desc, 1);
    put_fourcc(&mut desc, b"long");
    put_i32(&mut desc, 2);
    desc
}

fn shmd_block() -> Vec<u8> {
    let item = mlst_metadata_item();
    let mut payload = Vec::new();
    put_u32(&mut payload, 1); // one metadata item
    put_fourcc(&mut payload, b"8BIM");
    put_fourcc(&mut payload, b"mlst");
    payload.extend_from_slice(&[0u8; 4]); // discarded
    put_u32(&mut payload, item.len() as u32);
    payload.extend_from_slice(&item);
    tagged_block(b"8BIM", b"shmd", &payload)
}

#[test]
fn layer_tagged_blocks() {
    let mut lyid = Vec::new();
    put_u32(&mut lyid, 7);

    let mut lsct = Vec::new();
    put_u32(&mut lsct, SectionType::OpenFolder as u32);
    put_fourcc(&mut lsct, b"8BIM");
    put_fourcc(&mut lsct, b"pass");

    let mut luni = Vec::new();
    put_unicode(&mut luni, "Renamed");

    let layer = LayerFx::new("old", (0, 0, 1, 1))
        .channel(0, &[0x42])
        .extra(tagged_block(b"8BIM", b"lyid", &lyid))
        .extra(tagged_block(b"8BIM", b"lsct", &lsct))
        .extra(tagged_block(b"8BIM", b"luni", &luni))
        .extra(shmd_block());

    let mut file = file_header(PSD, 1, 1, 1, 8, ColorMode::Grayscale as u16);
    empty_color_mode(&mut file);
    empty_resources(&mut file);
    file.extend_from_slice(&layers_section(PSD, 1, &[layer]));
    composite_raw(&mut file, &[0x00]);

    let rec = decode_ok(file);
    let layers = rec.layers.expect("layers event");
    let layer = &layers.layers[0];
    assert_eq!(layer.layer_id, Some(7));
    assert_eq!(layer.section_type, SectionType::OpenFolder);
    assert_eq!(layer.name, "Renamed");
    assert_eq!(layer.in_frames.len(), 2);
    assert_eq!(layer.in_frames[0].frame_id, 1);
    assert!(!layer.in_frames[0].is_visible_in_frame);
    assert_eq!(layer.in_frames[1].frame_id, 2);
    assert!(!layer.in_frames[1].is_visible_in_frame);
}

#[test]
fn cinf_descriptor_version_mismatch_is_skipped() {
    // A cinf block whose descriptor version is not 16 is skipped via
    // the block framing instead of failing the decode.
    let mut cinf = Vec::new();
    put_u32(&mut cinf, 6); // not a descriptor version we know
    put_u32(&mut cinf, 0xDEAD_BEEF);

    let layer = LayerFx::new("layer", (0, 0, 1, 1))
        .channel(0, &[0x42])
        .extra(tagged_block(b"8BIM", b"cinf", &cinf));

    let mut file = file_header(PSD, 1, 1, 1, 8, ColorMode::Grayscale as u16);
    empty_color_mode(&mut file);
    empty_resources(&mut file);
    file.extend_from_slice(&layers_section(PSD, 1, &[layer]));
    composite_raw(&mut file, &[0x00]);

    let rec = decode_ok(file);
    let layers = rec.layers.expect("layers event");
    assert_eq!(layers.layers[0].name, "layer");
    // Layer channel plus composite: everything after the skipped block
    // still decodes.
    assert_eq!(rec.scanlines.len(), 2);
}

#[test]
fn psb_wide_tagged_block_after_global_mask() {
    // An `8B64`-signed Mtrn block in a PSB file carries an 8-byte
    // length. It sits between the global mask info and the section end.
    let mut body = Vec::new();
    put_u64(&mut body, 0); // empty layers-info block
    put_u32(&mut body, 0); // empty global mask info
    put_fourcc(&mut body, b"8B64");
    put_fourcc(&mut body, b"Mtrn");
    put_u64(&mut body, 2);
    body.extend_from_slice(&[0xEE, 0xFF]);

    let mut file = file_header(PSB, 1, 1, 1, 8, ColorMode::Grayscale as u16);
    empty_color_mode(&mut file);
    empty_resources(&mut file);
    put_u64(&mut file, body.len() as u64);
    file.extend_from_slice(&body);
    composite_raw(&mut file, &[0x00]);

    let rec = decode_ok(file);
    assert_eq!(rec.layers.expect("layers event").layers.len(), 0);
    assert_eq!(rec.scanlines.len(), 1);
}

// --- byte reader ---------------------------------------------------------

#[test]
fn reader_big_endian_roundtrip() {
    let mut buf = Vec::new();
    put_u16(&mut buf, 0xBEEF);
    put_u32(&mut buf, 0xDEAD_BEEF);
    put_u64(&mut buf, 0x0123_4567_89AB_CDEF);
    put_u32(&mut buf, 42); // PSB rle count
    put_u64(&mut buf, 43); // PSB length

    let mut r = PsdReader::new(Cursor::new(buf));
    assert_eq!(r.read_u16().unwrap(), 0xBEEF);
    assert_eq!(r.read_u32().unwrap(), 0xDEAD_BEEF);
    assert_eq!(r.read_u64().unwrap(), 0x0123_4567_89AB_CDEF);
    assert_eq!(r.read_rle_count(Version::Psb).unwrap(), 42);
    assert_eq!(r.read_length(Version::Psb).unwrap(), 43);

    // Reads past the end are errors, not zeros.
    assert!(r.read_u8().is_err());
}

#[test]
fn pascal_string_alignment() {
    // "abc" with alignment 2: length byte + 3 chars = 4 bytes, no pad.
    let mut buf = Vec::new();
    put_pascal(&mut buf, "abc", 2);
    assert_eq!(buf.len(), 4);
    let mut r = PsdReader::new(Cursor::new(buf));
    assert_eq!(r.read_pascal_string(2).unwrap(), "abc");
    assert_eq!(r.tell().unwrap(), 4);

    // "abc" with alignment 4: padded from 4 to 4, still no pad; "abcd"
    // with alignment 4: 5 bytes padded to 8.
    let mut buf = Vec::new();
    put_pascal(&mut buf, "abcd", 4);
    assert_eq!(buf.len(), 8);
    let mut r = PsdReader::new(Cursor::new(buf));
    assert_eq!(r.read_pascal_string(4).unwrap(), "abcd");
    assert_eq!(r.tell().unwrap(), 8);

    // Empty name, alignment 2: length byte plus one pad byte.
    let mut buf = Vec::new();
    put_pascal(&mut buf, "", 2);
    assert_eq!(buf.len(), 2);
    let mut r = PsdReader::new(Cursor::new(buf));
    assert_eq!(r.read_pascal_string(2).unwrap(), "");
    assert_eq!(r.tell().unwrap(), 2);
}

#[test]
fn unicode_string_reader() {
    let mut buf = Vec::new();
    put_unicode(&mut buf, "naïve\0");
    let mut r = PsdReader::new(Cursor::new(buf));
    // Trailing NULs counted by the length prefix are stripped.
    assert_eq!(r.read_unicode_string().unwrap(), "naïve");
}
