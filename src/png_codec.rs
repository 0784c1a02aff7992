//! PNG decode/encode bridge.
//!
//! The decoder is a small state machine (`Fresh -> SourceSet -> HeaderRead ->
//! Configured -> Prepared -> Consumed`) wrapped around the `png` crate's
//! inflate/deinterlace engine, with the option surface, message log, and
//! output-pixel-format negotiation layered on top in the style of
//! `strawlab-strand-braid/convert-image`'s decode entry points.

use crate::dyn_view::DynImageViewMut;
use crate::error::{DecodeError, EncodeError};
use crate::format::{PixelFormat, SampleFormat};
use crate::layout::{UntypedImageSemantics, UntypedLayout};
use crate::owned_dyn::DynImage;
use crate::primitives::PixelLength;
use std::io::{Read, Write};

/// Severity of a [`LogEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Message,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub severity: Severity,
    pub text: String,
}

/// Decompression options, negotiated between `HeaderRead` and `Configured`.
/// Mirrors `selene::img_io::png::PNGDecompressionOptions`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecompressionOptions {
    pub force_bit_depth_8: bool,
    pub set_background: bool,
    pub strip_alpha_channel: bool,
    pub swap_alpha_channel: bool,
    pub set_bgr: bool,
    pub invert_alpha_channel: bool,
    pub invert_monochrome: bool,
    pub convert_gray_to_rgb: bool,
    pub convert_rgb_to_gray: bool,
    pub keep_big_endian: bool,
}

/// Geometry and pixel format committed by `get_output_image_info()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputImageInfo {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub pixel_format: PixelFormat,
    pub sample_format: SampleFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Fresh,
    SourceSet,
    HeaderRead,
    Configured,
    Prepared,
    Consumed,
}

struct HeaderInfo {
    width: u32,
    height: u32,
    channels: u8,
    bit_depth: u8,
    color_type: png::ColorType,
}

/// Streaming PNG decoder over a byte source `R`.
pub struct PngReader<R: Read> {
    phase: Phase,
    source: Option<R>,
    png_reader: Option<png::Reader<R>>,
    header: Option<HeaderInfo>,
    options: DecompressionOptions,
    output_info: Option<OutputImageInfo>,
    log: Vec<LogEntry>,
    error: bool,
}

impl<R: Read> Default for PngReader<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Read> PngReader<R> {
    pub fn new() -> Self {
        PngReader {
            phase: Phase::Fresh,
            source: None,
            png_reader: None,
            header: None,
            options: DecompressionOptions::default(),
            output_info: None,
            log: Vec::new(),
            error: false,
        }
    }

    fn push_log(&mut self, severity: Severity, text: impl Into<String>) {
        let text = text.into();
        match severity {
            Severity::Message => log::info!("{text}"),
            Severity::Warning => log::warn!("{text}"),
            Severity::Error => log::error!("{text}"),
        }
        self.log.push(LogEntry { severity, text });
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn has_error(&self) -> bool {
        self.error
    }

    /// `Fresh -> SourceSet`.
    pub fn set_source(&mut self, source: R) -> Result<(), DecodeError> {
        if self.phase != Phase::Fresh && self.phase != Phase::Consumed {
            return Err(DecodeError::InvalidPhase);
        }
        self.source = Some(source);
        self.phase = Phase::SourceSet;
        Ok(())
    }

    /// `SourceSet -> HeaderRead`. If `rewind` is true the state machine does
    /// not advance (the header may be probed repeatedly before committing).
    pub fn read_header(&mut self, rewind: bool) -> Result<(u32, u32, u8, u8), DecodeError> {
        if self.phase != Phase::SourceSet {
            return Err(DecodeError::InvalidPhase);
        }
        let source = self.source.take().ok_or(DecodeError::InvalidPhase)?;
        let mut decoder = png::Decoder::new(source);
        // Expands sub-byte (1/2/4-bit) samples to 8 bits and resolves
        // palette indices to RGB(A), so no caller ever sees packed or
        // indexed pixels out of `next_row`/`next_frame`.
        decoder.set_transformations(png::Transformations::EXPAND);
        let reader = decoder.read_info().map_err(|e| {
            self.error = true;
            DecodeError::Malformed(e.to_string())
        })?;
        let (color_type, bit_depth) = reader.output_color_type();
        let channels = color_type.samples() as u8;
        let info = reader.info();
        let header = HeaderInfo {
            width: info.width,
            height: info.height,
            channels,
            bit_depth: bit_depth as u8,
            color_type,
        };
        let result = (header.width, header.height, header.channels, header.bit_depth);
        self.png_reader = Some(reader);
        self.header = Some(header);
        if !rewind {
            self.phase = Phase::HeaderRead;
        } else {
            self.phase = Phase::SourceSet;
        }
        Ok(result)
    }

    /// `HeaderRead -> Configured`. May be called any number of times while
    /// still in `HeaderRead`/`Configured`.
    pub fn set_decompression_options(&mut self, options: DecompressionOptions) -> Result<(), DecodeError> {
        if self.phase != Phase::HeaderRead && self.phase != Phase::Configured {
            return Err(DecodeError::InvalidPhase);
        }
        if options.convert_gray_to_rgb && options.convert_rgb_to_gray {
            self.error = true;
            self.push_log(Severity::Error, "convert_gray_to_rgb and convert_rgb_to_gray are mutually exclusive");
            return Err(DecodeError::Malformed("conflicting gray/rgb conversion options".into()));
        }
        self.options = options;
        self.phase = Phase::Configured;
        Ok(())
    }

    /// `Configured -> Prepared`. Derives the final output pixel format from
    /// the header and the negotiated options.
    pub fn get_output_image_info(&mut self) -> Result<OutputImageInfo, DecodeError> {
        if self.phase != Phase::Configured {
            return Err(DecodeError::InvalidPhase);
        }
        let header = self.header.as_ref().ok_or(DecodeError::InvalidPhase)?;
        let mut pixel_format = match header.color_type {
            png::ColorType::Grayscale => PixelFormat::Y,
            png::ColorType::GrayscaleAlpha => PixelFormat::YA,
            png::ColorType::Rgb => PixelFormat::RGB,
            png::ColorType::Rgba => PixelFormat::RGBA,
            png::ColorType::Indexed => PixelFormat::RGB,
        };
        let has_alpha = matches!(pixel_format, PixelFormat::YA | PixelFormat::RGBA);

        if self.options.convert_gray_to_rgb && matches!(pixel_format, PixelFormat::Y | PixelFormat::YA) {
            pixel_format = if has_alpha { PixelFormat::RGBA } else { PixelFormat::RGB };
        }
        if self.options.convert_rgb_to_gray && matches!(pixel_format, PixelFormat::RGB | PixelFormat::RGBA) {
            pixel_format = if has_alpha { PixelFormat::YA } else { PixelFormat::Y };
        }
        if self.options.strip_alpha_channel || self.options.set_background {
            pixel_format = match pixel_format {
                PixelFormat::YA => PixelFormat::Y,
                PixelFormat::RGBA => PixelFormat::RGB,
                other => other,
            };
        }
        if self.options.set_bgr {
            pixel_format = match pixel_format {
                PixelFormat::RGB => PixelFormat::BGR,
                PixelFormat::RGBA => PixelFormat::BGRA,
                other => other,
            };
        }
        if self.options.swap_alpha_channel {
            pixel_format = match pixel_format {
                PixelFormat::RGBA => PixelFormat::ARGB,
                PixelFormat::BGRA => PixelFormat::ABGR,
                other => other,
            };
        }

        let bit_depth = if self.options.force_bit_depth_8 { 8 } else { header.bit_depth };
        let info = OutputImageInfo {
            width: header.width,
            height: header.height,
            bit_depth,
            pixel_format,
            sample_format: SampleFormat::UnsignedInteger,
        };
        self.output_info = Some(info);
        self.phase = Phase::Prepared;
        Ok(info)
    }

    /// `Prepared -> Consumed`. Decodes the frame and writes it, row by row,
    /// into `sink`, which must already match the negotiated output shape.
    pub fn read_image_data(&mut self, sink: &mut DynImageViewMut<'_>) -> Result<(), DecodeError> {
        if self.phase != Phase::Prepared {
            return Err(DecodeError::InvalidPhase);
        }
        let info = *self.output_info.as_ref().ok_or(DecodeError::InvalidPhase)?;
        crate::dyn_view::check_shape(&sink.as_const(), info.width, info.height)?;

        let reader = self.png_reader.as_mut().ok_or(DecodeError::InvalidPhase)?;
        let mut raw = vec![0u8; reader.output_buffer_size()];
        let frame_info = reader.next_frame(&mut raw).map_err(|e| {
            self.error = true;
            self.push_log(Severity::Error, format!("PNG decode failed: {e}"));
            DecodeError::Malformed(e.to_string())
        })?;

        let header = self.header.as_ref().expect("header present in Prepared phase");
        let src_channels = header.channels as usize;
        let src_bytes_per_channel = if frame_info.bit_depth == png::BitDepth::Sixteen { 2 } else { 1 };
        let src_row_bytes = frame_info.line_size;

        for y in 0..info.height {
            let src_row = &raw[y as usize * src_row_bytes..y as usize * src_row_bytes + src_row_bytes];
            let dst_row = sink.byte_row_mut(y);
            decode_row_into(
                src_row,
                src_channels,
                src_bytes_per_channel,
                self.options,
                !self.options.keep_big_endian,
                dst_row,
            );
        }

        self.phase = Phase::Consumed;
        Ok(())
    }

    /// Allocates a [`DynImage`] of the negotiated output shape and decodes
    /// into it.
    pub fn read_image_into_owned(&mut self) -> Result<DynImage, DecodeError> {
        let info = *self.output_info.as_ref().ok_or(DecodeError::InvalidPhase)?;
        let bytes_per_channel = if info.bit_depth > 8 { 2 } else { 1 };
        let layout = UntypedLayout::new(
            PixelLength(info.width),
            PixelLength(info.height),
            info.pixel_format.channels().unwrap_or(1),
            bytes_per_channel,
        );
        let semantics = UntypedImageSemantics {
            pixel_format: info.pixel_format,
            sample_format: info.sample_format,
        };
        let mut image = DynImage::allocate(layout, semantics).map_err(|e| DecodeError::Malformed(e.to_string()))?;
        self.read_image_data(&mut image.as_view_mut())?;
        Ok(image)
    }
}

fn channel_value(row: &[u8], pixel: usize, channel: usize, channels: usize, bytes_per_channel: usize, to_host_endian: bool) -> u16 {
    let offset = (pixel * channels + channel) * bytes_per_channel;
    if bytes_per_channel == 2 {
        let bytes = [row[offset], row[offset + 1]];
        if to_host_endian {
            u16::from_be_bytes(bytes)
        } else {
            u16::from_le_bytes(bytes)
        }
    } else {
        row[offset] as u16
    }
}

/// Applies the negotiated decode-time transforms to one decoded row and
/// writes the 8-bit result into `dst_row`.
#[allow(clippy::too_many_arguments)]
fn decode_row_into(src_row: &[u8], src_channels: usize, src_bpc: usize, opts: DecompressionOptions, to_host_endian: bool, dst_row: &mut [u8]) {
    let max_val: u16 = if src_bpc == 2 { u16::MAX } else { 255 };
    let pixel_count = dst_row_pixel_count(dst_row.len(), src_channels, src_bpc, opts);
    for p in 0..pixel_count {
        let mut ch = [0u16; 4];
        for (c, slot) in ch.iter_mut().enumerate().take(src_channels) {
            *slot = channel_value(src_row, p, c, src_channels, src_bpc, to_host_endian);
        }
        let (mut r, mut g, mut b, mut a);
        match src_channels {
            1 => {
                r = ch[0];
                g = ch[0];
                b = ch[0];
                a = max_val;
            }
            2 => {
                r = ch[0];
                g = ch[0];
                b = ch[0];
                a = ch[1];
            }
            3 => {
                r = ch[0];
                g = ch[1];
                b = ch[2];
                a = max_val;
            }
            _ => {
                r = ch[0];
                g = ch[1];
                b = ch[2];
                a = ch[3];
            }
        }

        if opts.invert_monochrome && src_channels <= 2 {
            r = max_val - r;
            g = max_val - g;
            b = max_val - b;
        }
        if opts.invert_alpha_channel {
            a = max_val - a;
        }
        if opts.convert_rgb_to_gray && src_channels >= 3 {
            let luma = (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64).round();
            r = luma as u16;
            g = luma as u16;
            b = luma as u16;
        }

        let out_bpc = if opts.force_bit_depth_8 { 1 } else { src_bpc };
        let scale = |v: u16| -> u16 {
            if out_bpc == 1 && src_bpc == 2 {
                (v >> 8).min(255)
            } else {
                v
            }
        };
        let (r, g, b, a) = (scale(r), scale(g), scale(b), scale(a));

        let mut out: Vec<u16> = match src_channels {
            1 if opts.convert_gray_to_rgb => vec![r, g, b],
            2 if opts.convert_gray_to_rgb => vec![r, g, b, a],
            1 => vec![r],
            2 => vec![r, a],
            3 => vec![r, g, b],
            _ => vec![r, g, b, a],
        };
        if opts.set_bgr && out.len() >= 3 {
            out.swap(0, 2);
        }
        if opts.swap_alpha_channel && out.len() == 4 {
            out = vec![out[3], out[0], out[1], out[2]];
        }
        if opts.strip_alpha_channel || opts.set_background {
            if out.len() == 4 {
                out.truncate(3);
            } else if out.len() == 2 {
                out.truncate(1);
            }
        }

        let base = p * out.len() * out_bpc;
        for (i, v) in out.iter().enumerate() {
            let off = base + i * out_bpc;
            if out_bpc == 2 {
                dst_row[off..off + 2].copy_from_slice(&v.to_ne_bytes());
            } else {
                dst_row[off] = *v as u8;
            }
        }
    }
}

fn dst_row_pixel_count(dst_row_len: usize, src_channels: usize, src_bpc: usize, opts: DecompressionOptions) -> usize {
    let mut out_channels = src_channels;
    if opts.convert_gray_to_rgb && src_channels <= 2 {
        out_channels = if src_channels == 2 { 4 } else { 3 };
    }
    if opts.convert_rgb_to_gray && src_channels >= 3 {
        out_channels = if src_channels == 4 { 2 } else { 1 };
    }
    if opts.strip_alpha_channel || opts.set_background {
        out_channels = match out_channels {
            4 => 3,
            2 => 1,
            c => c,
        };
    }
    let out_bpc = if opts.force_bit_depth_8 { 1 } else { src_bpc };
    dst_row_len / (out_channels * out_bpc).max(1)
}

/// Encode-time options, the symmetric counterpart of
/// [`DecompressionOptions`].
#[derive(Debug, Clone, Copy)]
pub struct CompressionOptions {
    pub compression_level: u8,
    pub interlaced: bool,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        CompressionOptions {
            compression_level: 6,
            interlaced: false,
        }
    }
}

/// Streaming PNG encoder over a byte sink `W`.
pub struct PngWriter<W: Write> {
    sink: Option<W>,
    options: CompressionOptions,
}

impl<W: Write> Default for PngWriter<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> PngWriter<W> {
    pub fn new() -> Self {
        PngWriter { sink: None, options: CompressionOptions::default() }
    }

    pub fn set_sink(&mut self, sink: W) {
        self.sink = Some(sink);
    }

    pub fn set_compression_options(&mut self, options: CompressionOptions) {
        self.options = options;
    }

    /// Encodes `view`'s current contents as a PNG stream.
    pub fn write_image(&mut self, view: &crate::dyn_view::DynImageView<'_>) -> Result<(), EncodeError> {
        let sink = self.sink.take().expect("set_sink must be called before write_image");
        if self.options.interlaced {
            return Err(EncodeError::InterlacingUnsupported);
        }
        let (color_type, bit_depth) = png_color_for(view.pixel_format(), view.layout().bytes_per_channel)
            .ok_or(EncodeError::UnsupportedFormat(view.pixel_format()))?;

        let mut encoder = png::Encoder::new(sink, view.width().0, view.height().0);
        encoder.set_color(color_type);
        encoder.set_depth(bit_depth);
        encoder.set_compression(match self.options.compression_level {
            0..=3 => png::Compression::Fast,
            4..=7 => png::Compression::Default,
            _ => png::Compression::Best,
        });
        let mut writer = encoder.write_header()?;
        let mut buf = Vec::with_capacity(view.total_bytes().0);
        for y in 0..view.height().0 {
            buf.extend_from_slice(view.byte_row(y));
        }
        writer.write_image_data(&buf)?;
        Ok(())
    }
}

fn png_color_for(fmt: PixelFormat, bytes_per_channel: u8) -> Option<(png::ColorType, png::BitDepth)> {
    let color_type = match fmt {
        PixelFormat::Y => png::ColorType::Grayscale,
        PixelFormat::YA => png::ColorType::GrayscaleAlpha,
        PixelFormat::RGB => png::ColorType::Rgb,
        PixelFormat::RGBA => png::ColorType::Rgba,
        _ => return None,
    };
    let depth = if bytes_per_channel == 2 { png::BitDepth::Sixteen } else { png::BitDepth::Eight };
    Some((color_type, depth))
}

impl From<png::EncodingError> for EncodeError {
    fn from(e: png::EncodingError) -> Self {
        match e {
            png::EncodingError::IoError(io) => EncodeError::Io(io),
            other => EncodeError::Io(std::io::Error::other(other.to_string())),
        }
    }
}

impl From<png::DecodingError> for DecodeError {
    fn from(e: png::DecodingError) -> Self {
        match e {
            png::DecodingError::IoError(io) => DecodeError::Io(io),
            other => DecodeError::Malformed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dyn_view::DynImageView;
    use std::io::Cursor;

    fn encode_rgb_png(width: u32, height: u32, pixels: &[u8]) -> Vec<u8> {
        let layout = UntypedLayout::new(PixelLength(width), PixelLength(height), 3, 1);
        let semantics = UntypedImageSemantics {
            pixel_format: PixelFormat::RGB,
            sample_format: SampleFormat::UnsignedInteger,
        };
        let view = DynImageView::new(pixels, layout, semantics);
        let mut out = Vec::new();
        let mut writer = PngWriter::new();
        writer.set_sink(Cursor::new(&mut out));
        writer.write_image(&view).unwrap();
        out
    }

    #[test]
    fn roundtrip_preserves_pixels_under_default_options() {
        let pixels: Vec<u8> = (0..(4 * 4 * 3)).map(|i| (i * 7) as u8).collect();
        let png_bytes = encode_rgb_png(4, 4, &pixels);

        let mut reader: PngReader<Cursor<Vec<u8>>> = PngReader::new();
        reader.set_source(Cursor::new(png_bytes)).unwrap();
        let (w, h, channels, _depth) = reader.read_header(false).unwrap();
        assert_eq!((w, h, channels), (4, 4, 3));
        reader.set_decompression_options(DecompressionOptions::default()).unwrap();
        let info = reader.get_output_image_info().unwrap();
        assert_eq!(info.pixel_format, PixelFormat::RGB);

        let mut out = vec![0u8; (w * h * 3) as usize];
        let layout = UntypedLayout::new(PixelLength(w), PixelLength(h), 3, 1);
        let semantics = UntypedImageSemantics {
            pixel_format: PixelFormat::RGB,
            sample_format: SampleFormat::UnsignedInteger,
        };
        let mut sink = DynImageViewMut::new(&mut out, layout, semantics);
        reader.read_image_data(&mut sink).unwrap();
        assert_eq!(out, pixels);
    }

    #[test]
    fn set_bgr_swaps_red_and_blue() {
        let pixels: Vec<u8> = vec![10, 20, 30, 40, 50, 60];
        let png_bytes = encode_rgb_png(2, 1, &pixels);

        let mut reader: PngReader<Cursor<Vec<u8>>> = PngReader::new();
        reader.set_source(Cursor::new(png_bytes)).unwrap();
        reader.read_header(false).unwrap();
        let opts = DecompressionOptions { set_bgr: true, ..Default::default() };
        reader.set_decompression_options(opts).unwrap();
        let info = reader.get_output_image_info().unwrap();
        assert_eq!(info.pixel_format, PixelFormat::BGR);

        let mut out = vec![0u8; 6];
        let layout = UntypedLayout::new(PixelLength(2), PixelLength(1), 3, 1);
        let semantics = UntypedImageSemantics {
            pixel_format: PixelFormat::BGR,
            sample_format: SampleFormat::UnsignedInteger,
        };
        let mut sink = DynImageViewMut::new(&mut out, layout, semantics);
        reader.read_image_data(&mut sink).unwrap();
        assert_eq!(out, vec![30, 20, 10, 60, 50, 40]);
    }

    #[test]
    fn calling_methods_out_of_order_is_invalid_phase() {
        let mut reader: PngReader<Cursor<Vec<u8>>> = PngReader::new();
        let err = reader.read_header(false).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidPhase));
    }

    #[test]
    fn conflicting_gray_rgb_options_are_rejected() {
        let pixels: Vec<u8> = vec![1, 2, 3, 4, 5, 6];
        let png_bytes = encode_rgb_png(2, 1, &pixels);
        let mut reader: PngReader<Cursor<Vec<u8>>> = PngReader::new();
        reader.set_source(Cursor::new(png_bytes)).unwrap();
        reader.read_header(false).unwrap();
        let opts = DecompressionOptions { convert_gray_to_rgb: true, convert_rgb_to_gray: true, ..Default::default() };
        let err = reader.set_decompression_options(opts).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }
}
