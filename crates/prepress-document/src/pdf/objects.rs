// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Small helpers over the lopdf object model shared by the analyzers.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Reference chains longer than this are treated as broken.
const MAX_REFERENCE_DEPTH: usize = 16;

/// Follow indirect references until a direct object is reached.
///
/// Returns `None` for dangling or cyclic references.
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    let mut current = object;
    for _ in 0..MAX_REFERENCE_DEPTH {
        match current {
            Object::Reference(id) => current = doc.get_object(*id).ok()?,
            direct => return Some(direct),
        }
    }
    None
}

/// Resolve `object` to a dictionary. Streams yield their stream dictionary.
pub(crate) fn as_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, object)? {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

pub(crate) fn as_stream<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Stream> {
    match resolve(doc, object)? {
        Object::Stream(stream) => Some(stream),
        _ => None,
    }
}

pub(crate) fn as_array<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Vec<Object>> {
    match resolve(doc, object)? {
        Object::Array(items) => Some(items),
        _ => None,
    }
}

/// Numeric value of an Integer or Real.
pub(crate) fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(f64::from(*value)),
        _ => None,
    }
}

pub(crate) fn name(object: &Object) -> Option<&[u8]> {
    match object {
        Object::Name(name) => Some(name.as_slice()),
        _ => None,
    }
}

/// Dictionary entry, dereferenced.
pub(crate) fn entry<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    resolve(doc, dict.get(key).ok()?)
}

/// Look up a page attribute, walking up the page tree via /Parent when the
/// page itself does not carry it (MediaBox, Resources, Rotate are inheritable).
pub(crate) fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = page_id;
    for _ in 0..MAX_REFERENCE_DEPTH {
        let dict = doc.get_object(current).ok().and_then(|o| o.as_dict().ok())?;
        if let Ok(value) = dict.get(key) {
            return resolve(doc, value);
        }
        current = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

/// The resource dictionary in effect for a page.
pub(crate) fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    match inherited(doc, page_id, b"Resources")? {
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// Decoded stream bytes, falling back to the raw content for unfiltered or
/// unsupported filters.
pub(crate) fn stream_bytes(stream: &Stream) -> Vec<u8> {
    stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone())
}
