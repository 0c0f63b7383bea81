//! PDF watermarking.
//!
//! Every page gets a translucent overlay of rotated "HIGHLINE FUNDING" runs
//! drawn in Helvetica-Bold. The overlay is appended as a separate content
//! stream; the page's existing streams are kept and wrapped in `q … Q` so
//! whatever graphics state they leave behind cannot affect the overlay.
//!
//! Documents that only carry an owner password (the usual "no editing"
//! restriction on bank statements) open with the empty user password and
//! stay encrypted: the overlay streams are sealed with the document's own
//! key (see [`DocumentCipher`]). Anything that needs a real user password
//! fails to open and is returned untouched.

use super::font_metrics::helvetica_bold_text_width;
use super::outcome::WatermarkOutcome;
use super::pattern::{PageGeometry, PdfTileLayout};
use super::pdf_security::DocumentCipher;
use super::WatermarkError;
use crate::constants::{
    PDF_BASE_FONT, PDF_WATERMARK_OPACITY, PDF_WATERMARK_RGB, WATERMARK_ROTATION_DEGREES,
    WATERMARK_TEXT,
};
use bytes::Bytes;
use lopdf::content::{Content, Operation};
use lopdf::xref::XrefEntry;
use lopdf::{
    dictionary, Dictionary, Document, Object, ObjectId, ObjectStream, Reader, Stream, StringFormat,
};

/// Resource name prefix for the watermark font.
const FONT_RESOURCE_PREFIX: &str = "HLWmFont";

/// Resource name prefix for the watermark transparency state.
const GSTATE_RESOURCE_PREFIX: &str = "HLWmGS";

/// Page tree depth limit when looking up inherited attributes.
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Stand-in type for encrypted object streams until they are unpacked.
const HELD_OBJECT_STREAM: &[u8] = b"HLWmHeldObjStm";

/// Stamp a PDF, falling back to the original bytes on any failure.
pub fn watermark_pdf(data: Bytes) -> WatermarkOutcome {
    let attempt = try_watermark_pdf(&data);
    WatermarkOutcome::from_attempt(data, attempt)
}

/// Stamp every page of a PDF and return the re-serialized document.
pub fn try_watermark_pdf(data: &[u8]) -> Result<Vec<u8>, WatermarkError> {
    let (mut doc, cipher) = open_document(data)?;

    let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();
    if pages.is_empty() {
        return Err(WatermarkError::PdfWriteError(
            "Document has no pages".to_string(),
        ));
    }

    tracing::debug!(pages = pages.len(), encrypted = cipher.is_some(), "Stamping PDF");

    let stamper = PdfStamper::new(&mut doc, cipher)
        .map_err(|e| WatermarkError::PdfWriteError(format!("watermark resources: {}", e)))?;
    for (number, page_id) in pages {
        let tiles = stamper.stamp_page(&mut doc, page_id).map_err(|e| {
            WatermarkError::PdfWriteError(format!("page {}: {}", number, e))
        })?;
        tracing::debug!(page = number, tiles, "Page stamped");
    }

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| WatermarkError::PdfWriteError(e.to_string()))?;

    Ok(output)
}

/// Load a document, unlocking owner-password-only encryption.
///
/// Encrypted documents are not decrypted. Their object streams, which the
/// parser cannot read while encrypted, are unpacked by hand.
fn open_document(data: &[u8]) -> Result<(Document, Option<DocumentCipher>), WatermarkError> {
    let doc = Document::load_mem(data).map_err(|e| WatermarkError::PdfOpenError(e.to_string()))?;

    let cipher = match DocumentCipher::for_document(&doc)? {
        Some(cipher) => cipher,
        None => return Ok((doc, None)),
    };
    tracing::debug!(
        streams = ?cipher.stream_method(),
        strings = ?cipher.string_method(),
        "PDF is encrypted but opens without a password"
    );

    let has_object_streams = doc
        .reference_table
        .entries
        .values()
        .any(|entry| matches!(entry, XrefEntry::Compressed { .. }));
    if !has_object_streams {
        return Ok((doc, Some(cipher)));
    }

    let mut doc = Reader {
        buffer: data,
        document: Document::new(),
    }
    .read(Some(hold_object_stream))
    .map_err(|e| WatermarkError::PdfOpenError(e.to_string()))?;
    unpack_object_streams(&mut doc, &cipher)?;

    Ok((doc, Some(cipher)))
}

/// Load filter that keeps object streams packed, so they can be decrypted first.
fn hold_object_stream(id: ObjectId, object: &mut Object) -> Option<(ObjectId, Object)> {
    if let Object::Stream(stream) = object {
        if stream.dict.type_is(b"ObjStm") {
            stream.dict.set("Type", Object::Name(HELD_OBJECT_STREAM.to_vec()));
        }
    }
    Some((id, object.clone()))
}

/// Decrypt held object streams and promote their objects to top-level objects.
///
/// Promoted objects are written back individually, so their strings are
/// sealed under their own object keys. Objects already present at top level
/// win, as they do when the parser unpacks object streams itself.
fn unpack_object_streams(doc: &mut Document, cipher: &DocumentCipher) -> Result<(), WatermarkError> {
    let held: Vec<ObjectId> = doc
        .objects
        .iter()
        .filter(|(_, object)| {
            matches!(object, Object::Stream(stream) if stream.dict.type_is(HELD_OBJECT_STREAM))
        })
        .map(|(id, _)| *id)
        .collect();

    for container_id in held {
        let mut stream = match doc.objects.remove(&container_id) {
            Some(Object::Stream(stream)) => stream,
            _ => continue,
        };

        let plain = cipher
            .decrypt_stream(container_id, &stream.content)
            .map_err(|e| {
                WatermarkError::PdfOpenError(format!("object stream {:?}: {}", container_id, e))
            })?;
        stream.set_content(plain);
        stream.dict.set("Type", Object::Name(b"ObjStm".to_vec()));

        let unpacked = ObjectStream::new(&mut stream).map_err(|e| {
            WatermarkError::PdfOpenError(format!("object stream {:?}: {}", container_id, e))
        })?;

        for (id, mut object) in unpacked.objects {
            if doc.objects.contains_key(&id) {
                continue;
            }
            cipher.seal_strings(id, &mut object).map_err(|e| {
                WatermarkError::PdfWriteError(format!("object {:?}: {}", id, e))
            })?;
            doc.objects.insert(id, object);
        }
    }

    Ok(())
}

/// Document-wide watermark resources, created once and shared by every page.
struct PdfStamper {
    font_id: ObjectId,
    gstate_id: ObjectId,
    open_id: ObjectId,
    cipher: Option<DocumentCipher>,
}

impl PdfStamper {
    fn new(doc: &mut Document, cipher: Option<DocumentCipher>) -> Result<Self, String> {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => PDF_BASE_FONT,
            "Encoding" => "WinAnsiEncoding",
        });

        let gstate_id = doc.add_object(dictionary! {
            "Type" => "ExtGState",
            "ca" => Object::Real(PDF_WATERMARK_OPACITY),
            "CA" => Object::Real(PDF_WATERMARK_OPACITY),
        });

        // Opens the q/Q pair around each page's original content
        let open_id = add_stream(doc, cipher.as_ref(), b"q\n".to_vec())?;

        Ok(Self {
            font_id,
            gstate_id,
            open_id,
            cipher,
        })
    }

    /// Add the overlay to one page. Returns the number of tiles drawn.
    fn stamp_page(&self, doc: &mut Document, page_id: ObjectId) -> Result<usize, String> {
        let geometry = page_geometry(doc, page_id)?;
        let layout = PdfTileLayout::for_page(geometry, |size| {
            helvetica_bold_text_width(WATERMARK_TEXT, size)
        });
        let origins = layout.tile_origins();

        let mut resources = inherited_resources(doc, page_id)?;
        let mut fonts = owned_subdictionary(doc, &resources, b"Font")?;
        let mut gstates = owned_subdictionary(doc, &resources, b"ExtGState")?;

        let font_name = unique_resource_name(&fonts, FONT_RESOURCE_PREFIX);
        let gstate_name = unique_resource_name(&gstates, GSTATE_RESOURCE_PREFIX);
        fonts.set(font_name.as_bytes().to_vec(), Object::Reference(self.font_id));
        gstates.set(
            gstate_name.as_bytes().to_vec(),
            Object::Reference(self.gstate_id),
        );
        resources.set("Font", Object::Dictionary(fonts));
        resources.set("ExtGState", Object::Dictionary(gstates));

        // Streams are concatenated as-is, so the overlay must start on a token boundary
        let mut overlay = b"\n".to_vec();
        overlay.extend(
            overlay_content(&font_name, &gstate_name, layout.font_size, &origins)
                .encode()
                .map_err(|e| format!("failed to encode overlay: {}", e))?,
        );
        let existing = existing_contents(doc, page_id)?;
        let overlay_id = add_stream(doc, self.cipher.as_ref(), overlay)?;

        let mut contents = Vec::with_capacity(existing.len() + 2);
        contents.push(Object::Reference(self.open_id));
        contents.extend(existing);
        contents.push(Object::Reference(overlay_id));

        let page = doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| format!("page is not a dictionary: {}", e))?;
        page.set("Resources", Object::Dictionary(resources));
        page.set("Contents", Object::Array(contents));

        Ok(origins.len())
    }
}

/// Add a content stream, encrypted when the document is.
fn add_stream(
    doc: &mut Document,
    cipher: Option<&DocumentCipher>,
    content: Vec<u8>,
) -> Result<ObjectId, String> {
    let id = doc.new_object_id();
    let content = match cipher {
        Some(cipher) => cipher.encrypt_stream(id, &content)?,
        None => content,
    };
    doc.objects
        .insert(id, Object::Stream(Stream::new(Dictionary::new(), content)));
    Ok(id)
}

/// Overlay operations: close the original content, then draw every tile.
fn overlay_content(
    font_name: &str,
    gstate_name: &str,
    font_size: f32,
    origins: &[(f32, f32)],
) -> Content {
    let theta = WATERMARK_ROTATION_DEGREES.to_radians();
    let (sin, cos) = theta.sin_cos();
    let [r, g, b] = PDF_WATERMARK_RGB;

    let mut operations = Vec::with_capacity(origins.len() * 2 + 8);
    operations.push(Operation::new("Q", vec![]));
    operations.push(Operation::new("q", vec![]));
    operations.push(Operation::new(
        "gs",
        vec![Object::Name(gstate_name.as_bytes().to_vec())],
    ));
    operations.push(Operation::new(
        "rg",
        vec![Object::Real(r), Object::Real(g), Object::Real(b)],
    ));
    operations.push(Operation::new("BT", vec![]));
    operations.push(Operation::new(
        "Tf",
        vec![
            Object::Name(font_name.as_bytes().to_vec()),
            Object::Real(font_size),
        ],
    ));

    for &(x, y) in origins {
        operations.push(Operation::new(
            "Tm",
            vec![
                Object::Real(cos),
                Object::Real(sin),
                Object::Real(-sin),
                Object::Real(cos),
                Object::Real(x),
                Object::Real(y),
            ],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(
                WATERMARK_TEXT.as_bytes().to_vec(),
                StringFormat::Literal,
            )],
        ));
    }

    operations.push(Operation::new("ET", vec![]));
    operations.push(Operation::new("Q", vec![]));

    Content { operations }
}

/// Follow a reference to the object it names.
fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Result<&'a Object, String> {
    match object {
        Object::Reference(id) => doc
            .get_object(*id)
            .map_err(|e| format!("broken reference {:?}: {}", id, e)),
        other => Ok(other),
    }
}

/// Look up a page attribute, walking up the page tree for inherited values.
fn find_inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>, String> {
    let mut node_id = page_id;

    for _ in 0..MAX_INHERITANCE_DEPTH {
        let node = doc
            .get_dictionary(node_id)
            .map_err(|e| format!("page tree node {:?}: {}", node_id, e))?;

        if let Ok(value) = node.get(key) {
            return resolve(doc, value).map(Some);
        }

        match node.get(b"Parent") {
            Ok(Object::Reference(parent)) => node_id = *parent,
            _ => return Ok(None),
        }
    }

    Err("page tree too deep".to_string())
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Page size from its (possibly inherited) MediaBox.
fn page_geometry(doc: &Document, page_id: ObjectId) -> Result<PageGeometry, String> {
    let media_box = find_inherited(doc, page_id, b"MediaBox")?
        .ok_or_else(|| "page has no MediaBox".to_string())?;

    let values = media_box
        .as_array()
        .map_err(|_| "MediaBox is not an array".to_string())?
        .iter()
        .map(|v| resolve(doc, v).ok().and_then(number))
        .collect::<Option<Vec<f32>>>()
        .ok_or_else(|| "MediaBox has non-numeric entries".to_string())?;

    match values.as_slice() {
        [x0, y0, x1, y1] => Ok(PageGeometry::new((x1 - x0).abs(), (y1 - y0).abs())),
        _ => Err(format!("MediaBox has {} entries", values.len())),
    }
}

/// Copy of the page's effective resource dictionary.
fn inherited_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary, String> {
    match find_inherited(doc, page_id, b"Resources")? {
        Some(object) => object
            .as_dict()
            .cloned()
            .map_err(|_| "Resources is not a dictionary".to_string()),
        None => Ok(Dictionary::new()),
    }
}

/// Copy of a resource category (Font, ExtGState, ...), empty if absent.
fn owned_subdictionary(
    doc: &Document,
    resources: &Dictionary,
    key: &[u8],
) -> Result<Dictionary, String> {
    match resources.get(key) {
        Ok(object) => resolve(doc, object)?.as_dict().cloned().map_err(|_| {
            format!(
                "resource category {} is not a dictionary",
                String::from_utf8_lossy(key)
            )
        }),
        Err(_) => Ok(Dictionary::new()),
    }
}

/// A resource name not already used in `dict`.
fn unique_resource_name(dict: &Dictionary, prefix: &str) -> String {
    if !dict.has(prefix.as_bytes()) {
        return prefix.to_string();
    }

    let mut n = 1u32;
    loop {
        let candidate = format!("{}{}", prefix, n);
        if !dict.has(candidate.as_bytes()) {
            return candidate;
        }
        n += 1;
    }
}

/// The page's current content stream references, in order.
fn existing_contents(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>, String> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|e| format!("page is not a dictionary: {}", e))?;

    match page.get(b"Contents") {
        Err(_) => Ok(Vec::new()),
        Ok(reference @ Object::Reference(id)) => match doc.get_object(*id) {
            // An indirect array of streams is flattened into the new array
            Ok(Object::Array(items)) => Ok(items.clone()),
            Ok(_) => Ok(vec![reference.clone()]),
            Err(e) => Err(format!("broken Contents reference: {}", e)),
        },
        Ok(Object::Array(items)) => Ok(items.clone()),
        Ok(_) => Err("Contents is neither a stream reference nor an array".to_string()),
    }
}
