use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackFormatError {
    #[error("{source_url} is not valid JSON: {source}")]
    Json {
        source_url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{source_url} has invalid format: {message}")]
    InvalidFormat { source_url: String, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PackEntry {
    Image {
        key: String,
        url: String,
    },
    Atlas {
        key: String,
        atlas_url: String,
        texture_url: Option<String>,
    },
    MultiAtlas {
        key: String,
        url: String,
        base_path: String,
    },
    Spritesheet {
        key: String,
        url: String,
        frame_width: f64,
        frame_height: f64,
    },
    Unsupported {
        key: String,
        kind: String,
    },
}

impl PackEntry {
    pub fn key(&self) -> &str {
        match self {
            PackEntry::Image { key, .. }
            | PackEntry::Atlas { key, .. }
            | PackEntry::MultiAtlas { key, .. }
            | PackEntry::Spritesheet { key, .. }
            | PackEntry::Unsupported { key, .. } => key,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PackSection {
    #[serde(default)]
    files: Vec<RawPackFile>,
    #[serde(default)]
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPackFile {
    #[serde(rename = "type")]
    kind: String,
    key: String,
    #[serde(default)]
    url: Option<Value>,
    #[serde(default, rename = "textureURL")]
    texture_url: Option<String>,
    #[serde(default, rename = "atlasURL")]
    atlas_url: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default, rename = "frameConfig")]
    frame_config: Option<FrameConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FrameConfig {
    frame_width: f64,
    frame_height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSize {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtlasFrames {
    pub frames: BTreeMap<String, FrameSize>,
    pub size: Option<FrameSize>,
}

/// Lists the files a Phaser asset pack manifest declares. Sections without a `files` array
/// (such as `meta`) are skipped.
pub fn parse_pack_manifest(source_url: &str, bytes: &[u8]) -> Result<Vec<PackEntry>, PackFormatError> {
    let root: Value = serde_json::from_slice(bytes).map_err(|source| PackFormatError::Json {
        source_url: source_url.to_string(),
        source,
    })?;
    let sections = root.as_object().ok_or_else(|| PackFormatError::InvalidFormat {
        source_url: source_url.to_string(),
        message: "manifest root must be an object".to_string(),
    })?;

    let mut entries = Vec::new();
    for (name, section) in sections {
        if section.get("files").is_none() {
            continue;
        }
        let section: PackSection =
            serde_json::from_value(section.clone()).map_err(|error| PackFormatError::InvalidFormat {
                source_url: source_url.to_string(),
                message: format!("section '{name}': {error}"),
            })?;
        let prefix = section.path.as_deref();
        for file in section.files {
            entries.push(entry_from_raw(file, prefix));
        }
    }
    Ok(entries)
}

fn entry_from_raw(file: RawPackFile, section_path: Option<&str>) -> PackEntry {
    let RawPackFile {
        kind,
        key,
        url,
        texture_url,
        atlas_url,
        path,
        frame_config,
    } = file;
    let url = url.as_ref().and_then(first_url);
    let resolve = |url: &str| resolve_entry_url(section_path, url);

    match (kind.as_str(), url, atlas_url, frame_config) {
        ("image", Some(url), _, _) => PackEntry::Image {
            key,
            url: resolve(&url),
        },
        ("atlas", _, Some(atlas_url), _) => PackEntry::Atlas {
            key,
            atlas_url: resolve(&atlas_url),
            texture_url: texture_url.as_deref().map(resolve),
        },
        ("multiatlas", Some(url), _, _) => PackEntry::MultiAtlas {
            key,
            url: resolve(&url),
            base_path: path.as_deref().or(section_path).unwrap_or("").to_string(),
        },
        ("spritesheet", Some(url), _, Some(frame)) => PackEntry::Spritesheet {
            key,
            url: resolve(&url),
            frame_width: frame.frame_width,
            frame_height: frame.frame_height,
        },
        _ => PackEntry::Unsupported {
            key,
            kind: kind.clone(),
        },
    }
}

fn first_url(value: &Value) -> Option<String> {
    match value {
        Value::String(url) => Some(url.clone()),
        Value::Array(urls) => urls.iter().find_map(|url| url.as_str().map(ToString::to_string)),
        _ => None,
    }
}

/// Absolute URLs and rooted paths are kept; relative ones are placed under the section path
/// and rooted.
pub fn resolve_entry_url(section_path: Option<&str>, url: &str) -> String {
    if url.contains("://") || url.starts_with('/') {
        return url.to_string();
    }
    let joined = match section_path.filter(|path| !path.is_empty()) {
        Some(path) => format!("{}/{}", path.trim_end_matches('/'), url),
        None => url.to_string(),
    };
    if joined.starts_with('/') || joined.contains("://") {
        joined
    } else {
        format!("/{joined}")
    }
}

/// Frame sizes from a multiatlas (`textures[].frames[]`), a JSON-hash atlas
/// (`frames: {name: ..}`) or a JSON-array atlas (`frames: [..]`). Trimmed frames report
/// their untrimmed `sourceSize`.
pub fn parse_atlas_frames(source_url: &str, bytes: &[u8]) -> Result<AtlasFrames, PackFormatError> {
    let root: Value = serde_json::from_slice(bytes).map_err(|source| PackFormatError::Json {
        source_url: source_url.to_string(),
        source,
    })?;

    let mut atlas = AtlasFrames::default();
    if let Some(textures) = root.get("textures").and_then(Value::as_array) {
        for texture in textures {
            if atlas.size.is_none() {
                atlas.size = texture.get("size").and_then(size_of);
            }
            collect_frames(texture.get("frames"), &mut atlas.frames);
        }
    } else if root.get("frames").is_some() {
        atlas.size = root.pointer("/meta/size").and_then(size_of);
        collect_frames(root.get("frames"), &mut atlas.frames);
    } else {
        return Err(PackFormatError::InvalidFormat {
            source_url: source_url.to_string(),
            message: "expected 'textures' or 'frames'".to_string(),
        });
    }
    Ok(atlas)
}

fn collect_frames(frames: Option<&Value>, target: &mut BTreeMap<String, FrameSize>) {
    match frames {
        Some(Value::Array(items)) => {
            for item in items {
                let name = item.get("filename").and_then(Value::as_str);
                if let (Some(name), Some(size)) = (name, frame_size(item)) {
                    target.insert(name.to_string(), size);
                }
            }
        }
        Some(Value::Object(entries)) => {
            for (name, item) in entries {
                if let Some(size) = frame_size(item) {
                    target.insert(name.clone(), size);
                }
            }
        }
        _ => {}
    }
}

fn frame_size(item: &Value) -> Option<FrameSize> {
    item.get("sourceSize")
        .and_then(size_of)
        .or_else(|| item.get("frame").and_then(size_of))
}

fn size_of(value: &Value) -> Option<FrameSize> {
    Some(FrameSize {
        width: value.get("w")?.as_f64()?,
        height: value.get("h")?.as_f64()?,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn manifest_sections_yield_typed_entries() {
        let manifest = json!({
            "section1": {
                "files": [
                    { "type": "image", "key": "bg", "url": "assets/media/rooms/town/bg.png" },
                    { "type": "multiatlas", "key": "town", "url": "assets/media/rooms/town/town.json",
                      "path": "assets/media/rooms/town" },
                    { "type": "atlas", "key": "ui", "atlasURL": "ui.json", "textureURL": "ui.png" },
                    { "type": "spritesheet", "key": "walk", "url": ["walk.png"],
                      "frameConfig": { "frameWidth": 32, "frameHeight": 48 } },
                    { "type": "audio", "key": "music", "url": "music.mp3" }
                ]
            },
            "meta": { "app": "Phaser Editor 2D - Asset Pack Editor", "version": 2 }
        });
        let entries =
            parse_pack_manifest("/pack.json", manifest.to_string().as_bytes()).expect("manifest");

        assert_eq!(entries.len(), 5);
        assert_eq!(
            entries[0],
            PackEntry::Image {
                key: "bg".to_string(),
                url: "/assets/media/rooms/town/bg.png".to_string()
            }
        );
        assert_eq!(
            entries[1],
            PackEntry::MultiAtlas {
                key: "town".to_string(),
                url: "/assets/media/rooms/town/town.json".to_string(),
                base_path: "assets/media/rooms/town".to_string()
            }
        );
        assert!(matches!(&entries[2], PackEntry::Atlas { atlas_url, .. } if atlas_url == "/ui.json"));
        assert!(matches!(
            &entries[3],
            PackEntry::Spritesheet { frame_width, .. } if *frame_width == 32.0
        ));
        assert!(matches!(&entries[4], PackEntry::Unsupported { kind, .. } if kind == "audio"));
    }

    #[test]
    fn section_path_prefixes_relative_urls() {
        assert_eq!(
            resolve_entry_url(Some("assets/media/"), "a.png"),
            "/assets/media/a.png"
        );
        assert_eq!(resolve_entry_url(Some("x"), "/abs.png"), "/abs.png");
        assert_eq!(
            resolve_entry_url(None, "http://cdn/a.png"),
            "http://cdn/a.png"
        );
    }

    #[test]
    fn multiatlas_frames_prefer_source_size() {
        let atlas = json!({
            "textures": [{
                "image": "town.png",
                "size": { "w": 1024, "h": 512 },
                "frames": [
                    { "filename": "bg", "frame": { "x": 0, "y": 0, "w": 100, "h": 50 },
                      "sourceSize": { "w": 120, "h": 60 } },
                    { "filename": "door", "frame": { "x": 0, "y": 0, "w": 30, "h": 40 } }
                ]
            }]
        });
        let frames = parse_atlas_frames("/town.json", atlas.to_string().as_bytes()).expect("atlas");
        assert_eq!(frames.frames["bg"], FrameSize { width: 120.0, height: 60.0 });
        assert_eq!(frames.frames["door"], FrameSize { width: 30.0, height: 40.0 });
        assert_eq!(frames.size, Some(FrameSize { width: 1024.0, height: 512.0 }));
    }

    #[test]
    fn hash_atlas_frames_are_read_by_name() {
        let atlas = json!({
            "frames": { "btn_0001": { "frame": { "x": 0, "y": 0, "w": 64, "h": 32 } } },
            "meta": { "size": { "w": 256, "h": 256 } }
        });
        let frames = parse_atlas_frames("/ui.json", atlas.to_string().as_bytes()).expect("atlas");
        assert_eq!(frames.frames.len(), 1);
        assert_eq!(frames.size, Some(FrameSize { width: 256.0, height: 256.0 }));
    }

    #[test]
    fn malformed_documents_are_errors() {
        assert!(matches!(
            parse_pack_manifest("/p.json", b"[1, 2]"),
            Err(PackFormatError::InvalidFormat { .. })
        ));
        assert!(matches!(
            parse_atlas_frames("/a.json", b"not json"),
            Err(PackFormatError::Json { .. })
        ));
    }
}
