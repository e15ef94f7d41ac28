//! FFmpeg decode backend for `FileSource`.
//!
//! Wraps libavformat/libavcodec via `ffmpeg_next`: packets are pulled from
//! the container, decoded, and rescaled to packed RGB24. When the container
//! runs out the decoder is flushed once so buffered frames still come out;
//! after that every call reports end of stream. A local decode cannot stall
//! the way a network stream does, so the backend is healthy until it records
//! an error.

use anyhow::{bail, Context, Result};
use ffmpeg_next as ffmpeg;

use super::file::FileConfig;
use crate::frame::Frame;
use crate::source::SourceStats;

pub(crate) struct FfmpegDecoder {
    config: FileConfig,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    frame_count: u64,
    last_error: Option<String>,
    flushed: bool,
}

impl FfmpegDecoder {
    pub(crate) fn new(config: FileConfig) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&config.path)
            .with_context(|| format!("open video file '{}'", config.path))?;
        let Some(video_stream) = input.streams().best(ffmpeg::media::Type::Video) else {
            bail!("'{}' has no video track", config.path);
        };
        let stream_index = video_stream.index();
        let codec_ctx =
            ffmpeg::codec::context::Context::from_parameters(video_stream.parameters())
                .context("read video codec parameters")?;
        let decoder = codec_ctx.decoder().video().context("open video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create RGB24 scaler")?;

        Ok(Self {
            config,
            input,
            stream_index,
            decoder,
            scaler,
            frame_count: 0,
            last_error: None,
            flushed: false,
        })
    }

    pub(crate) fn connect(&mut self) -> Result<()> {
        log::info!("FileSource: decoding {} via ffmpeg", self.config.path);
        Ok(())
    }

    pub(crate) fn next_frame(&mut self) -> Result<Frame> {
        let mut decoded = ffmpeg::frame::Video::empty();
        let mut rgb = ffmpeg::frame::Video::empty();

        loop {
            // A single packet can yield several frames; drain the decoder
            // before feeding it the next one.
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return self.scale_and_pack(&decoded, &mut rgb);
            }

            let Some((stream, packet)) = self.input.packets().next() else {
                break;
            };
            if stream.index() != self.stream_index {
                continue;
            }
            self.decoder
                .send_packet(&packet)
                .context("feed packet to video decoder")?;
        }

        // Container exhausted: flush once, then hand out whatever the
        // decoder still buffers.
        if !self.flushed {
            self.flushed = true;
            let _ = self.decoder.send_eof();
        }
        if self.decoder.receive_frame(&mut decoded).is_ok() {
            return self.scale_and_pack(&decoded, &mut rgb);
        }

        self.last_error = Some("end of stream".to_string());
        bail!("video file {} is exhausted", self.config.path)
    }

    fn scale_and_pack(
        &mut self,
        decoded: &ffmpeg::frame::Video,
        rgb: &mut ffmpeg::frame::Video,
    ) -> Result<Frame> {
        self.scaler
            .run(decoded, rgb)
            .context("rescale decoded frame to RGB24")?;
        let frame =
            Frame::from_strided_rgb8(rgb.data(0), rgb.stride(0), rgb.width(), rgb.height())?;
        self.frame_count += 1;
        Ok(frame)
    }

    pub(crate) fn is_healthy(&self) -> bool {
        self.last_error.is_none()
    }

    pub(crate) fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            endpoint: self.config.path.clone(),
        }
    }
}
