//! Data structures representing PSD format components.

use super::super::error::{PsdError, Result};
use super::descriptor::Descriptor;

/// PSD file version.
///
/// PSB ("Photoshop Big") files share the PSD layout but use 8-byte
/// lengths for selected sections and allow larger canvases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Psd,
    Psb,
}

impl Version {
    /// Maximum width/height in pixels for this file version.
    pub fn dimension_limit(self) -> u32 {
        match self {
            Version::Psd => 30_000,
            Version::Psb => 300_000,
        }
    }
}

impl TryFrom<u16> for Version {
    type Error = PsdError;
    fn try_from(value: u16) -> Result<Self> {
        match value {
            1 => Ok(Self::Psd),
            2 => Ok(Self::Psb),
            _ => Err(PsdError::UnsupportedVersion(value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Bitmap = 0,
    Grayscale = 1,
    Indexed = 2,
    Rgb = 3,
    Cmyk = 4,
    Multichannel = 7,
    Duotone = 8,
    Lab = 9,
}

impl TryFrom<u16> for ColorMode {
    type Error = PsdError;
    fn try_from(value: u16) -> Result<Self> {
        match value {
            0 => Ok(Self::Bitmap),
            1 => Ok(Self::Grayscale),
            2 => Ok(Self::Indexed),
            3 => Ok(Self::Rgb),
            4 => Ok(Self::Cmyk),
            7 => Ok(Self::Multichannel),
            8 => Ok(Self::Duotone),
            9 => Ok(Self::Lab),
            _ => Err(PsdError::InvalidColorMode(value)),
        }
    }
}

/// Parsed file header.
///
/// Written once during the header section and consulted read-only by
/// every later section (version-switched lengths, depth, channel count).
#[derive(Debug, Clone, Copy)]
pub struct FileHeader {
    pub version: Version,
    pub nchannels: u16,
    pub width: u32,
    pub height: u32,
    pub depth: u16,
    pub color_mode: ColorMode,
}

/// One RGB entry of an indexed-mode palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Color mode data section contents.
///
/// Only indexed and duotone files carry a non-empty section; the
/// delegate event is emitted only for those.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorModeData {
    /// 256-entry palette, stored on disk as 256 reds, 256 greens,
    /// 256 blues.
    Indexed(Vec<IndexColor>),
    /// Undocumented duotone data, preserved verbatim so it can be
    /// written back unchanged.
    Duotone(Vec<u8>),
}

/// Payload of a single image resource block.
#[derive(Debug, Clone)]
pub enum ResourcePayload {
    /// A descriptor tree (resource ids 1065, 1074..1088, 3000).
    Descriptor(Descriptor),
    /// Parsed slice geometry (resource id 1050).
    Slices(SlicesData),
    /// Parsed animation frames (resource id 4003).
    Frames {
        frames: Vec<FrameInformation>,
        active_frame_index: u32,
    },
    /// Raw bytes of a resource this crate does not interpret.
    Raw(Vec<u8>),
    /// Zero-length resource.
    Empty,
}

/// One image resource block from the image resources section.
#[derive(Debug, Clone)]
pub struct ImageResource {
    pub resource_id: u16,
    pub name: String,
    pub payload: ResourcePayload,
}

impl ImageResource {
    /// Human-readable description of a resource id, or `""` for ids the
    /// format documentation does not name.
    pub fn id_description(resource_id: u16) -> &'static str {
        match resource_id {
            1000 | 1003 | 0x03EA | 0x03EF | 0x03FC | 0x03FF | 0x0403 => "(obsolete)",
            0x03E9 => "Macintosh print manager print info record",
            0x03ED => "ResolutionInfo structure",
            0x03EE => "Names of the alpha channels",
            0x03F0 => "Caption",
            0x03F1 => "Border information",
            0x03F2 => "Background color",
            0x03F3 => "Print flags",
            0x03F4 => "Grayscale and multichannel halftoning information",
            0x03F5 => "Color halftoning information",
            0x03F6 => "Duotone halftoning information",
            0x03F7 => "Grayscale and multichannel transfer function",
            0x03F8 => "Color transfer functions",
            0x03F9 => "Duotone transfer functions",
            0x03FA => "Duotone image information",
            0x03FB => "Effective black and white values for the dot range",
            0x03FD => "EPS options",
            0x03FE => "Quick Mask information",
            0x0400 => "Layer state information",
            0x0401 => "Working path (not saved)",
            0x0402 => "Layers group information",
            0x0404 => "IPTC-NAA record",
            0x0405 => "Image mode for raw format files",
            0x0406 => "JPEG quality",
            0x0408 => "Grid and guides information",
            0x0409 => "Thumbnail resource (Photoshop 4.0)",
            0x040A => "Copyright flag",
            0x040B => "URL",
            0x040C => "Thumbnail resource",
            0x040D => "Global Angle",
            0x040E | 0x0431 => "Color samplers resource",
            0x040F => "ICC Profile",
            0x0410 => "Watermark",
            0x0411 => "ICC Untagged Profile",
            0x0412 => "Effects visible",
            0x0413 => "Spot Halftone",
            0x0414 => "Document-specific IDs seed number",
            0x0415 => "Unicode Alpha Names",
            0x0416 => "Indexed Color Table Count",
            0x0417 => "Transparency Index",
            0x0419 => "Global Altitude",
            0x041A => "Slices",
            0x041B => "Workflow URL",
            0x041C => "Jump To XPEP",
            0x041D => "Alpha Identifiers",
            0x041E => "URL List",
            0x0421 => "Version Info",
            0x0422 => "EXIF data 1",
            0x0423 => "EXIF data 3",
            0x0424 => "XMP metadata",
            0x0425 => "Caption digest",
            0x0426 => "Print scale",
            0x0428 => "Pixel Aspect Ratio",
            0x0429 => "Layer Comps",
            0x042A => "Alternate Duotone Colors",
            0x042B => "Alternate Spot Colors",
            0x042D => "Layer Selection ID(s)",
            0x042E => "HDR Toning information",
            0x042F => "Print info",
            0x0430 => "Layer Group(s) Enabled ID",
            0x0432 => "Measurement Scale",
            0x0433 => "Timeline Information",
            0x0434 => "Sheet Disclosure",
            0x0435 => "DisplayInfo structure",
            0x0436 => "Onion Skins",
            0x0438 => "Count Information",
            0x043A => "Print Information",
            0x043B => "Print Style",
            0x043C => "Macintosh NSPrintInfo",
            0x043D => "Windows DEVMODE",
            0x043E => "Auto Save File Path",
            0x043F => "Auto Save Format",
            0x0440 => "Path Selection State",
            2999 => "Name of clipping path",
            3000 => "Origin Path Info",
            7000 => "Image Ready variables",
            7001 => "Image Ready data sets",
            7002 => "Image Ready default selected state",
            7003 => "Image Ready 7 rollover expanded state",
            7004 => "Image Ready rollover expanded state",
            7005 => "Image Ready save layer settings",
            7006 => "Image Ready version",
            8000 => "Lightroom workflow",
            10000 => "Print flags information",
            2000..=2997 => "Path Information",
            4000..=4999 => "Plug-In resource",
            _ => "",
        }
    }
}

/// One animation frame from the `AnDs` animated-data resource.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInformation {
    pub id: u32,
    /// Frame delay, in the document's time base.
    pub duration: u32,
    pub ga: f64,
}

/// Per-frame visibility of a layer, accrued from `mlst` metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameVisibility {
    pub frame_id: u32,
    pub is_visible_in_frame: bool,
}

/// A rectangle in pixels, `(top, left, bottom, right)` order as on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
}

impl Bounds {
    pub fn width(&self) -> u32 {
        (self.right - self.left).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.bottom - self.top).max(0) as u32
    }
}

/// Parsed slice resource (resource id 1050).
#[derive(Debug, Clone, Default)]
pub struct SlicesData {
    /// Bounding rectangle of the group of slices.
    pub bounds: Bounds,
    /// Group name (v6) or base name (v7/8).
    pub group_name: String,
    pub slices: Vec<Slice>,
}

/// One slice from a slice resource.
#[derive(Debug, Clone, Default)]
pub struct Slice {
    pub slice_id: u32,
    pub group_id: u32,
    pub bounds: Bounds,
    pub url: String,
    pub message: String,
    pub alt_tag: String,
    pub cell_text: String,
    pub cell_text_is_html: bool,
}

/// Identifies a channel inside layer or composite pixel data.
///
/// Non-negative ids address color channels; negative ids address masks.
/// Color modes with more than four components (CMYK spot channels and
/// multichannel documents) use ids past 3, carried through as `Custom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelId {
    Red,
    Green,
    Blue,
    Alpha,
    TransparencyMask,
    UserSuppliedMask,
    RealUserSuppliedMask,
    Custom(i16),
}

impl From<i16> for ChannelId {
    fn from(value: i16) -> Self {
        match value {
            0 => Self::Red,
            1 => Self::Green,
            2 => Self::Blue,
            3 => Self::Alpha,
            -1 => Self::TransparencyMask,
            -2 => Self::UserSuppliedMask,
            -3 => Self::RealUserSuppliedMask,
            other => Self::Custom(other),
        }
    }
}

/// One channel entry of a layer record: its id and the byte length of
/// its compressed data (compression marker included).
#[derive(Debug, Clone, Copy)]
pub struct Channel {
    pub channel_id: ChannelId,
    pub length: u64,
}

macro_rules! blend_modes {
    ($($name:ident = $code:literal),+ $(,)?) => {
        /// Layer blend mode, stored on disk as a four-character code
        /// after an `8BIM` signature.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum LayerBlendMode {
            $($name,)+
        }

        impl LayerBlendMode {
            pub fn fourcc(self) -> [u8; 4] {
                match self {
                    $(Self::$name => *$code,)+
                }
            }
        }

        impl TryFrom<[u8; 4]> for LayerBlendMode {
            type Error = PsdError;
            fn try_from(code: [u8; 4]) -> Result<Self> {
                match &code {
                    $($code => Ok(Self::$name),)+
                    _ => Err(PsdError::InvalidFormat(format!(
                        "unknown blend mode '{}'",
                        String::from_utf8_lossy(&code)
                    ))),
                }
            }
        }
    };
}

blend_modes! {
    PassThrough = b"pass",
    Normal = b"norm",
    Dissolve = b"diss",
    Darken = b"dark",
    Multiply = b"mul ",
    ColorBurn = b"idiv",
    LinearBurn = b"lbrn",
    DarkerColor = b"dkCl",
    Lighten = b"lite",
    Screen = b"scrn",
    ColorDodge = b"div ",
    LinearDodge = b"lddg",
    LighterColor = b"lgCl",
    Overlay = b"over",
    SoftLight = b"sLit",
    HardLight = b"hLit",
    VividLight = b"vLit",
    LinearLight = b"lLit",
    PinLight = b"pLit",
    HardMix = b"hMix",
    Difference = b"diff",
    Exclusion = b"smud",
    Subtract = b"fsub",
    Divide = b"fdiv",
    Hue = b"hue ",
    Saturation = b"sat ",
    Color = b"colr",
    Luminosity = b"lum ",
}

/// Group-structure role of a layer, from the `lsct` section divider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SectionType {
    #[default]
    Other = 0,
    OpenFolder = 1,
    CloseFolder = 2,
    BoundingSection = 3,
}

impl TryFrom<u32> for SectionType {
    type Error = PsdError;
    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Self::Other),
            1 => Ok(Self::OpenFolder),
            2 => Ok(Self::CloseFolder),
            3 => Ok(Self::BoundingSection),
            _ => Err(PsdError::InvalidFormat(format!(
                "invalid section divider type: {value}"
            ))),
        }
    }
}

/// One layer record from the layers-info block.
#[derive(Debug, Clone)]
pub struct LayerRecord {
    pub bounds: Bounds,
    pub channels: Vec<Channel>,
    pub blend_mode: LayerBlendMode,
    pub opacity: u8,
    /// 0 = base, 1 = non-base.
    pub clipping: u8,
    pub flags: u8,
    pub name: String,
    /// From the `lyid` tagged block, when present.
    pub layer_id: Option<u32>,
    /// From the `lsct` tagged block; `Other` when absent.
    pub section_type: SectionType,
    /// Per-frame visibility, from `mlst` metadata inside `shmd`.
    pub in_frames: Vec<FrameVisibility>,
    /// From the `cust` metadata key inside `shmd`.
    pub layer_time: Option<f64>,
}

impl LayerRecord {
    pub fn width(&self) -> u32 {
        self.bounds.width()
    }

    pub fn height(&self) -> u32 {
        self.bounds.height()
    }

    pub fn is_transparency_protected(&self) -> bool {
        self.flags & 1 != 0
    }

    pub fn is_visible(&self) -> bool {
        self.flags & 2 != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskKind {
    Inverted = 0,
    ColorProtected = 1,
    ExactPixelValue = 128,
}

impl TryFrom<u8> for MaskKind {
    type Error = PsdError;
    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Inverted),
            1 => Ok(Self::ColorProtected),
            128 => Ok(Self::ExactPixelValue),
            _ => Err(PsdError::InvalidFormat(format!(
                "unexpected global mask kind: {value}"
            ))),
        }
    }
}

/// Global mask info from the layers-and-mask section.
#[derive(Debug, Clone, Copy)]
pub struct GlobalMaskInfo {
    /// 0 = transparent, 100 = opaque.
    pub opacity: u16,
    pub kind: MaskKind,
}

/// All layers plus the global mask info.
#[derive(Debug, Clone, Default)]
pub struct LayersInformation {
    pub layers: Vec<LayerRecord>,
    pub mask_info: Option<GlobalMaskInfo>,
    /// Set when the layer count was negative: the first alpha channel
    /// of the merged result holds its transparency.
    pub first_channel_is_transparency: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    RawImageData = 0,
    Rle = 1,
    ZipWithoutPrediction = 2,
    ZipWithPrediction = 3,
}

impl TryFrom<u16> for CompressionMethod {
    type Error = PsdError;
    fn try_from(value: u16) -> Result<Self> {
        match value {
            0 => Ok(Self::RawImageData),
            1 => Ok(Self::Rle),
            2 => Ok(Self::ZipWithoutPrediction),
            3 => Ok(Self::ZipWithPrediction),
            _ => Err(PsdError::InvalidFormat(format!(
                "unknown compression method: {value}"
            ))),
        }
    }
}

/// Geometry and channel list for one run of pixel data (a layer
/// channel or the composite image).
#[derive(Debug, Clone)]
pub struct ImageData {
    pub compression: CompressionMethod,
    pub width: u32,
    pub height: u32,
    pub depth: u16,
    pub channels: Vec<ChannelId>,
}
