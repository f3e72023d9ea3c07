use std::io;
use std::str;

use bytes::{Buf, Bytes};

use crate::errors::Result;
use crate::packet::PacketTrait;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::Tag;

/// User ID Packet
/// <https://tools.ietf.org/html/rfc4880.html#section-5.11>
///
/// The body is kept as raw bytes, it should be UTF-8 but often is not.
#[derive(Clone, PartialEq, Eq, derive_more::Debug)]
pub struct UserId {
    #[debug("{:?}", String::from_utf8_lossy(id))]
    id: Bytes,
}

/// The conventional `name (comment) <email>` structure of a user id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserIdParts {
    pub name: Option<String>,
    pub comment: Option<String>,
    pub email: Option<String>,
}

impl UserId {
    pub fn new(id: &str) -> Self {
        UserId {
            id: Bytes::copy_from_slice(id.as_bytes()),
        }
    }

    pub fn from_buf<B: Buf>(mut i: B) -> Self {
        UserId { id: i.rest() }
    }

    /// Builds `name (comment) <email>`, leaving out the missing parts.
    pub fn from_parts(name: Option<&str>, comment: Option<&str>, email: Option<&str>) -> Self {
        let mut parts = Vec::with_capacity(3);
        if let Some(name) = name.filter(|s| !s.is_empty()) {
            parts.push(name.to_string());
        }
        if let Some(comment) = comment.filter(|s| !s.is_empty()) {
            parts.push(format!("({comment})"));
        }
        if let Some(email) = email.filter(|s| !s.is_empty()) {
            parts.push(format!("<{email}>"));
        }

        Self::new(&parts.join(" "))
    }

    pub fn id(&self) -> &[u8] {
        &self.id
    }

    /// The id as text, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        str::from_utf8(&self.id).ok()
    }

    /// Splits the id into name, comment and email.
    ///
    /// Returns `None` for ids that are not UTF-8 or do not follow one of the forms
    /// `name (comment) <email>`, `name <email>`, `name` or `<email>`.
    pub fn parts(&self) -> Option<UserIdParts> {
        parse_parts(self.as_str()?)
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn parse_parts(id: &str) -> Option<UserIdParts> {
    // <email>
    if let Some(email) = id.strip_prefix('<').and_then(|r| r.strip_suffix('>')) {
        if email.is_empty() || email.contains('>') {
            return None;
        }
        return Some(UserIdParts {
            email: non_empty(email),
            ..Default::default()
        });
    }

    if let Some(rest) = id.strip_suffix('>') {
        let open = rest.rfind('<')?;
        let email = &rest[open + 1..];
        let before = &rest[..open];
        if email.is_empty() || email.contains('>') || !before.ends_with(char::is_whitespace) {
            return None;
        }
        let before = before.trim_end();

        // name (comment) <email>
        if let Some(inner) = before.strip_suffix(')') {
            if let Some((name, comment)) = inner.split_once('(') {
                if !name.is_empty() && !comment.is_empty() && !comment.contains(')') {
                    return Some(UserIdParts {
                        name: non_empty(name),
                        comment: non_empty(comment),
                        email: non_empty(email),
                    });
                }
            }
        }

        // name <email>
        if before.is_empty() || before.contains('<') {
            return None;
        }
        return Some(UserIdParts {
            name: non_empty(before),
            comment: None,
            email: non_empty(email),
        });
    }

    // name
    if id.is_empty() || id.contains('<') {
        return None;
    }
    Some(UserIdParts {
        name: non_empty(id),
        ..Default::default()
    })
}

impl Serialize for UserId {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.id)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.id.len()
    }
}

impl PacketTrait for UserId {
    fn tag(&self) -> Tag {
        Tag::UserId
    }
}
