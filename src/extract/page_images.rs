// Embedded raster recovery for scanned pages
//
// Scanned statements are typically one full-page image XObject per
// page. This walks the page's resources, finds the largest image and
// decodes it so the OCR engine has pixels to work with.
use anyhow::{anyhow, Result};
use flate2::read::ZlibDecoder;
use image::DynamicImage;
use lopdf::{Dictionary, Document, Object, Stream};
use std::io::Read;
use tracing::debug;

/// Recover the dominant raster image of a page, if any.
pub fn page_image(document: &Document, page: &Dictionary) -> Result<Option<DynamicImage>> {
    let mut best: Option<(f32, &Stream)> = None;

    let resources = match page.get(b"Resources") {
        Ok(resources) => resources,
        Err(_) => return Ok(None),
    };
    let res_dict = match resolve_dict(document, resources) {
        Some(dict) => dict,
        None => return Ok(None),
    };
    let xobjects = match res_dict.get(b"XObject") {
        Ok(xobjects) => xobjects,
        Err(_) => return Ok(None),
    };
    let xobj_dict = match resolve_dict(document, xobjects) {
        Some(dict) => dict,
        None => return Ok(None),
    };

    for (_name, obj) in xobj_dict.iter() {
        let stream = match resolve_stream(document, obj) {
            Some(stream) => stream,
            None => continue,
        };
        if !is_image(document, &stream.dict) {
            continue;
        }
        let width = dict_number(document, &stream.dict, b"Width").unwrap_or(0.0);
        let height = dict_number(document, &stream.dict, b"Height").unwrap_or(0.0);
        let area = width * height;
        if best.as_ref().map_or(true, |(a, _)| area > *a) {
            best = Some((area, stream));
        }
    }

    match best {
        Some((_, stream)) => decode_image(document, stream).map(Some),
        None => Ok(None),
    }
}

// lopdf refuses to decompress /Image streams, so the stream body is
// handled here directly.
fn decode_image(document: &Document, stream: &Stream) -> Result<DynamicImage> {
    let filter = first_filter(document, &stream.dict);

    match filter.as_deref() {
        // JPEG-compressed scan: the stream body is the JPEG file.
        Some("DCTDecode") => {
            image::load_from_memory(&stream.content).map_err(|e| anyhow!("JPEG decode failed: {e}"))
        }
        Some("FlateDecode") => {
            let mut data = Vec::new();
            ZlibDecoder::new(stream.content.as_slice())
                .read_to_end(&mut data)
                .map_err(|e| anyhow!("flate decode failed: {e}"))?;
            raw_samples_to_image(document, &stream.dict, data)
        }
        // Unfiltered: raw samples described by the dict.
        None => raw_samples_to_image(document, &stream.dict, stream.content.clone()),
        Some(other) => Err(anyhow!("unsupported image filter {other}")),
    }
}

fn raw_samples_to_image(
    document: &Document,
    dict: &Dictionary,
    data: Vec<u8>,
) -> Result<DynamicImage> {
    let width = dict_number(document, dict, b"Width").ok_or_else(|| anyhow!("image has no Width"))? as u32;
    let height =
        dict_number(document, dict, b"Height").ok_or_else(|| anyhow!("image has no Height"))? as u32;
    let bits = dict_number(document, dict, b"BitsPerComponent").unwrap_or(8.0) as u32;
    if bits != 8 {
        return Err(anyhow!("unsupported bit depth {bits}"));
    }

    let colorspace = dict_name(document, dict, b"ColorSpace").unwrap_or_else(|| "DeviceGray".into());
    match colorspace.as_str() {
        "DeviceGray" => {
            let expected = (width * height) as usize;
            if data.len() < expected {
                return Err(anyhow!("truncated grayscale image data"));
            }
            let buffer = image::GrayImage::from_raw(width, height, data)
                .ok_or_else(|| anyhow!("grayscale buffer size mismatch"))?;
            Ok(DynamicImage::ImageLuma8(buffer))
        }
        "DeviceRGB" => {
            let expected = (width * height * 3) as usize;
            if data.len() < expected {
                return Err(anyhow!("truncated RGB image data"));
            }
            let buffer = image::RgbImage::from_raw(width, height, data)
                .ok_or_else(|| anyhow!("RGB buffer size mismatch"))?;
            Ok(DynamicImage::ImageRgb8(buffer))
        }
        other => {
            debug!(colorspace = other, "unsupported colorspace");
            Err(anyhow!("unsupported colorspace {other}"))
        }
    }
}

fn is_image(document: &Document, dict: &Dictionary) -> bool {
    matches!(dict_name(document, dict, b"Subtype").as_deref(), Some("Image"))
}

fn first_filter(document: &Document, dict: &Dictionary) -> Option<String> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => Some(String::from_utf8_lossy(name).into_owned()),
        Ok(Object::Array(arr)) => arr.first().and_then(|o| match o {
            Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
            _ => None,
        }),
        Ok(Object::Reference(id)) => match document.get_object(*id) {
            Ok(Object::Name(name)) => Some(String::from_utf8_lossy(name).into_owned()),
            _ => None,
        },
        _ => None,
    }
}

fn resolve_dict<'a>(document: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match obj {
        Object::Reference(id) => match document.get_object(*id) {
            Ok(Object::Dictionary(dict)) => Some(dict),
            _ => None,
        },
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn resolve_stream<'a>(document: &'a Document, obj: &'a Object) -> Option<&'a Stream> {
    match obj {
        Object::Reference(id) => match document.get_object(*id) {
            Ok(Object::Stream(stream)) => Some(stream),
            _ => None,
        },
        Object::Stream(stream) => Some(stream),
        _ => None,
    }
}

fn dict_number(document: &Document, dict: &Dictionary, key: &[u8]) -> Option<f32> {
    match dict.get(key).ok()? {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) => Some(*f),
        Object::Reference(id) => match document.get_object(*id).ok()? {
            Object::Integer(i) => Some(*i as f32),
            Object::Real(f) => Some(*f),
            _ => None,
        },
        _ => None,
    }
}

fn dict_name(document: &Document, dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key).ok()? {
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        Object::Reference(id) => match document.get_object(*id).ok()? {
            Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
            _ => None,
        },
        _ => None,
    }
}
