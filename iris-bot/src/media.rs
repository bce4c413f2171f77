//! Media conversion: still images and voice audio.
//!
//! All conversions are pure functions over byte buffers with in-memory
//! staging only, so a failing conversion can never leak temporary files.

use std::io::Cursor;
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::io::MediaSourceStream;
use thiserror::Error;

/// Media conversion error.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Image decode failed: {0}")]
    ImageDecode(String),

    #[error("Image encode failed: {0}")]
    ImageEncode(String),

    #[error("Audio transcode failed: {0}")]
    AudioTranscode(String),

    #[error("WAV encode failed: {0}")]
    WavEncode(String),
}

/// One decoded image, normalized to 8-bit RGB.
///
/// This is the form the session store holds and the vision backends consume.
#[derive(Debug, Clone)]
pub struct SessionImage {
    rgb: image::RgbImage,
}

impl SessionImage {
    /// Wrap an already-decoded RGB bitmap.
    pub fn from_rgb(rgb: image::RgbImage) -> Self {
        Self { rgb }
    }

    /// Image dimensions as (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        self.rgb.dimensions()
    }

    /// Borrow the underlying bitmap.
    pub fn as_rgb(&self) -> &image::RgbImage {
        &self.rgb
    }
}

/// A normalized PCM waveform: mono f32 samples.
#[derive(Debug, Clone)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    /// Duration in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Decode still-image bytes into a normalized RGB bitmap.
pub fn decode_image(bytes: &[u8]) -> Result<SessionImage, MediaError> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| MediaError::ImageDecode(e.to_string()))?;
    Ok(SessionImage::from_rgb(decoded.to_rgb8()))
}

/// Re-encode a session image as JPEG for wire transfer to inference backends.
pub fn encode_jpeg(image: &SessionImage) -> Result<Vec<u8>, MediaError> {
    let mut buf = Cursor::new(Vec::new());
    image
        .as_rgb()
        .write_to(&mut buf, image::ImageFormat::Jpeg)
        .map_err(|e| MediaError::ImageEncode(e.to_string()))?;
    Ok(buf.into_inner())
}

fn conv<T>(samples: &mut Vec<f32>, data: std::borrow::Cow<'_, symphonia::core::audio::AudioBuffer<T>>)
where
    T: symphonia::core::sample::Sample,
    f32: FromSample<T>,
{
    samples.extend(data.chan(0).iter().map(|v| f32::from_sample(*v)));
}

/// Decode a compressed voice container (e.g. Opus-in-Ogg) to a mono PCM
/// waveform.
///
/// Malformed input and containers whose codec has no decoder both surface as
/// `AudioTranscode`.
pub fn transcode_voice(bytes: &[u8]) -> Result<Waveform, MediaError> {
    let mss = MediaSourceStream::new(
        Box::new(Cursor::new(bytes.to_vec())),
        Default::default(),
    );

    let hint = symphonia::core::probe::Hint::new();
    let meta_opts: symphonia::core::meta::MetadataOptions = Default::default();
    let fmt_opts: symphonia::core::formats::FormatOptions = Default::default();

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &fmt_opts, &meta_opts)
        .map_err(|e| MediaError::AudioTranscode(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| MediaError::AudioTranscode("no decodable audio track".into()))?;

    let dec_opts: DecoderOptions = Default::default();
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &dec_opts)
        .map_err(|e| MediaError::AudioTranscode(format!("unsupported codec: {e}")))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| MediaError::AudioTranscode("missing sample rate".into()))?;

    let mut samples = Vec::new();
    while let Ok(packet) = format.next_packet() {
        while !format.metadata().is_latest() {
            format.metadata().pop();
        }

        if packet.track_id() != track_id {
            continue;
        }

        match decoder
            .decode(&packet)
            .map_err(|e| MediaError::AudioTranscode(e.to_string()))?
        {
            AudioBufferRef::F32(buf) => samples.extend(buf.chan(0)),
            AudioBufferRef::F64(data) => conv(&mut samples, data),
            AudioBufferRef::U8(data) => conv(&mut samples, data),
            AudioBufferRef::U16(data) => conv(&mut samples, data),
            AudioBufferRef::U24(data) => conv(&mut samples, data),
            AudioBufferRef::U32(data) => conv(&mut samples, data),
            AudioBufferRef::S8(data) => conv(&mut samples, data),
            AudioBufferRef::S16(data) => conv(&mut samples, data),
            AudioBufferRef::S24(data) => conv(&mut samples, data),
            AudioBufferRef::S32(data) => conv(&mut samples, data),
        }
    }

    if samples.is_empty() {
        return Err(MediaError::AudioTranscode("no audio frames decoded".into()));
    }

    Ok(Waveform {
        samples,
        sample_rate,
    })
}

/// Encode a waveform as 16-bit PCM WAV for upload to the transcriber.
pub fn waveform_to_wav(waveform: &Waveform) -> Result<Vec<u8>, MediaError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: waveform.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| MediaError::WavEncode(e.to_string()))?;
        for &sample in &waveform.samples {
            let clamped = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
            writer
                .write_sample(clamped)
                .map_err(|e| MediaError::WavEncode(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| MediaError::WavEncode(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn wav_bytes(sample_rate: u32, samples: &[i16]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn decode_valid_png() {
        let img = decode_image(&png_bytes(4, 3)).unwrap();
        assert_eq!(img.dimensions(), (4, 3));
    }

    #[test]
    fn decode_garbage_fails() {
        let err = decode_image(b"definitely not an image").unwrap_err();
        assert!(matches!(err, MediaError::ImageDecode(_)));
    }

    #[test]
    fn decode_normalizes_to_rgb() {
        // RGBA source gets flattened to 3 channels.
        let rgba = image::RgbaImage::from_pixel(2, 2, image::Rgba([1, 2, 3, 128]));
        let mut buf = Cursor::new(Vec::new());
        rgba.write_to(&mut buf, image::ImageFormat::Png).unwrap();

        let img = decode_image(&buf.into_inner()).unwrap();
        assert_eq!(img.as_rgb().get_pixel(0, 0).0.len(), 3);
    }

    #[test]
    fn jpeg_roundtrip_preserves_dimensions() {
        let img = decode_image(&png_bytes(6, 5)).unwrap();
        let jpeg = encode_jpeg(&img).unwrap();
        let back = decode_image(&jpeg).unwrap();
        assert_eq!(back.dimensions(), (6, 5));
    }

    #[test]
    fn transcode_wav_container() {
        let samples: Vec<i16> = (0..1600).map(|i| ((i % 64) * 256) as i16).collect();
        let wav = wav_bytes(16_000, &samples);

        let waveform = transcode_voice(&wav).unwrap();
        assert_eq!(waveform.sample_rate, 16_000);
        assert_eq!(waveform.samples.len(), samples.len());
        assert!((waveform.duration_secs() - 0.1).abs() < 1e-3);
    }

    #[test]
    fn transcode_garbage_fails() {
        let err = transcode_voice(b"not audio at all").unwrap_err();
        assert!(matches!(err, MediaError::AudioTranscode(_)));
    }

    #[test]
    fn wav_encode_roundtrip() {
        let waveform = Waveform {
            samples: vec![0.0, 0.5, -0.5, 1.0, -1.0],
            sample_rate: 8_000,
        };
        let wav = waveform_to_wav(&waveform).unwrap();

        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 8_000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.len(), 5);
    }

    #[test]
    fn wav_encode_clamps_out_of_range_samples() {
        let waveform = Waveform {
            samples: vec![2.0, -2.0],
            sample_rate: 8_000,
        };
        let wav = waveform_to_wav(&waveform).unwrap();

        let mut reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, vec![i16::MAX, -i16::MAX]);
    }
}
