//! Metadata extraction from audio file tags and stream properties
//!
//! Uses lofty to read ID3v2 (MP3), Vorbis comments (FLAC) and RIFF INFO /
//! ID3 (WAV) tags together with duration and bitrate.

use crate::error::{IntakeError, Result};
use crate::types::AudioMetadata;
use lofty::{AudioFile, FileType, Probe, Tag, TaggedFileExt};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Reads [`AudioMetadata`] from files on disk
#[derive(Debug, Clone, Default)]
pub struct MetadataExtractor;

impl MetadataExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract metadata from `path`
    ///
    /// A file without a tag block yields empty `tags`; a missing bitrate
    /// yields 0. Only an unreadable or unparseable file is an error.
    pub fn extract(&self, path: &Path) -> Result<AudioMetadata> {
        let tagged_file = Probe::open(path)
            .and_then(|p| p.read())
            .map_err(|e| IntakeError::metadata_error(path, e.to_string()))?;

        let properties = tagged_file.properties();
        let bitrate_kbps = properties
            .audio_bitrate()
            .or_else(|| properties.overall_bitrate())
            .unwrap_or(0);

        let tags = match tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
            Some(tag) => collect_tags(tag),
            None => {
                debug!("No tags found in {}", path.display());
                BTreeMap::new()
            }
        };

        let metadata = AudioMetadata {
            format: mime_for(tagged_file.file_type()).to_string(),
            duration_seconds: properties.duration().as_secs_f64(),
            bitrate_bps: u64::from(bitrate_kbps) * 1000,
            sample_rate: properties.sample_rate(),
            channels: properties.channels(),
            tags,
        };

        debug!(
            "Metadata for {}: {} {:.2}s {}bps, {} tags",
            path.display(),
            metadata.format,
            metadata.duration_seconds,
            metadata.bitrate_bps,
            metadata.tags.len()
        );

        Ok(metadata)
    }
}

/// Text items keyed by the tag format's native key names
fn collect_tags(tag: &Tag) -> BTreeMap<String, String> {
    let tag_type = tag.tag_type();
    let mut tags = BTreeMap::new();

    for item in tag.items() {
        let Some(value) = item.value().text() else {
            continue;
        };
        let key = item
            .key()
            .map_key(tag_type, true)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{:?}", item.key()));
        // First occurrence wins for repeated keys
        tags.entry(key).or_insert_with(|| value.to_string());
    }

    tags
}

fn mime_for(file_type: FileType) -> &'static str {
    match file_type {
        FileType::Mpeg => "audio/mpeg",
        FileType::Flac => "audio/flac",
        FileType::Wav => "audio/wav",
        FileType::Aiff => "audio/aiff",
        FileType::Vorbis => "audio/ogg",
        FileType::Opus => "audio/opus",
        FileType::Mp4 => "audio/mp4",
        FileType::Aac => "audio/aac",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_wav(path: &Path, seconds: u32, sample_rate: u32, channels: u16) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..(seconds * sample_rate * channels as u32) {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_untagged_wav() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.wav");
        write_wav(&path, 2, 8000, 1);

        let meta = MetadataExtractor::new().extract(&path).unwrap();
        assert_eq!(meta.format, "audio/wav");
        assert!((meta.duration_seconds - 2.0).abs() < 0.01);
        assert!(meta.tags.is_empty());
        assert_eq!(meta.sample_rate, Some(8000));
        assert_eq!(meta.channels, Some(1));
        // 8000 Hz * 16 bit * 1 ch
        assert!(meta.bitrate_bps.abs_diff(128_000) <= 2_000, "{}", meta.bitrate_bps);
    }

    #[test]
    fn test_missing_file_is_metadata_error() {
        let err = MetadataExtractor::new()
            .extract(Path::new("/nonexistent/file.mp3"))
            .unwrap_err();
        assert!(matches!(err, IntakeError::Metadata { .. }));
    }

    #[test]
    fn test_garbage_is_metadata_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fake.mp3");
        std::fs::write(&path, b"this is not audio at all").unwrap();
        let err = MetadataExtractor::new().extract(&path).unwrap_err();
        assert!(matches!(err, IntakeError::Metadata { .. }));
    }

    #[test]
    fn test_tagged_wav_reports_native_keys() {
        use lofty::{ItemKey, TagExt, TagType};

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tagged.wav");
        write_wav(&path, 1, 8000, 2);

        let mut tag = Tag::new(TagType::Id3v2);
        tag.insert_text(ItemKey::TrackTitle, "Intake Test".to_string());
        tag.insert_text(ItemKey::TrackArtist, "Some Band".to_string());
        tag.save_to_path(&path).unwrap();

        let meta = MetadataExtractor::new().extract(&path).unwrap();
        assert_eq!(meta.tags.get("TIT2").map(String::as_str), Some("Intake Test"));
        assert_eq!(meta.tags.get("TPE1").map(String::as_str), Some("Some Band"));
        assert_eq!(meta.channels, Some(2));
        assert!((meta.duration_seconds - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_collect_tags_keeps_first_text_value() {
        use lofty::{ItemKey, ItemValue, TagItem, TagType};

        let mut tag = Tag::new(TagType::Id3v2);
        tag.push(TagItem::new(ItemKey::TrackTitle, ItemValue::Text("First".into())));
        tag.push(TagItem::new(ItemKey::TrackTitle, ItemValue::Text("Second".into())));
        tag.push_unchecked(TagItem::new(ItemKey::Comment, ItemValue::Binary(vec![0, 1, 2])));
        tag.push(TagItem::new(
            ItemKey::AudioFileUrl,
            ItemValue::Locator("https://example.com/a.mp3".into()),
        ));
        tag.push_unchecked(TagItem::new(
            ItemKey::Unknown("XMOD".into()),
            ItemValue::Text("calm".into()),
        ));

        let tags = collect_tags(&tag);
        let expected: BTreeMap<String, String> = [("TIT2", "First"), ("XMOD", "calm")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(tags, expected);
    }
}
