//! Per-call encoding state.
//!
//! A [`HandleState`] is created for every `handle` and `with_attrs` call and
//! consumed at the end of it. It owns a scratch [`Buffer`], the separator
//! pending before the next key, the dotted key prefix of the text encodings,
//! and the stack of open group names.
//!
//! Groups are materialized lazily. Opening a group only pushes its name; the
//! JSON `"name":{` (or the text `name.` prefix) is written when the first key
//! inside it is written. A group whose attributes all turn out to be empty is
//! therefore never written, without a look-ahead pass.

use std::borrow::Cow;
use std::fmt::{Display, Write};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, FixedOffset};

use crate::buffer::{Buffer, FreeList};
use crate::color::LogColor;
use crate::error::MarshalError;
use crate::escape::{append_escaped_json, append_quoted, needs_quoting};
use crate::handler::{Config, Encoding, HandlerInner};
use crate::keys;
use crate::number;
use crate::record::Record;
use crate::time;
use crate::value::{Attr, Value};

const KEY_COMPONENT_SEP: char = '.';
const MAX_POOLED_GROUP_LISTS: usize = 64;
const INITIAL_GROUP_CAPACITY: usize = 10;

static GROUP_LISTS: FreeList<Vec<String>> = FreeList::new(MAX_POOLED_GROUP_LISTS);

/// What a finished state leaves behind.
pub(crate) struct Parts {
    pub(crate) buf: Buffer,
    /// Text key prefix of the materialized groups still open.
    pub(crate) prefix: String,
    /// Number of stacked groups that were written.
    pub(crate) materialized: usize,
}

pub(crate) struct HandleState<'h> {
    config: &'h Config,
    buf: Buffer,
    /// Written before the next key; empty at the start of an object.
    sep: &'h str,
    /// Color of the in-flight value, pretty mode only.
    color: Option<LogColor>,
    prefix: String,
    /// Every open group name, materialized or not. The replace callback
    /// sees this list.
    groups: Vec<String>,
    /// `groups[..materialized]` have been written.
    materialized: usize,
    /// Writing time, level, source or message.
    builtin: bool,
}

impl<'h> HandleState<'h> {
    pub(crate) fn new(config: &'h Config, buf: Buffer, sep: &'h str) -> Self {
        Self {
            config,
            buf,
            sep,
            color: None,
            prefix: String::new(),
            groups: GROUP_LISTS
                .take()
                .unwrap_or_else(|| Vec::with_capacity(INITIAL_GROUP_CAPACITY)),
            materialized: 0,
            builtin: false,
        }
    }

    /// Returns the buffer and group bookkeeping; the group list goes back to
    /// the pool.
    pub(crate) fn into_parts(self) -> Parts {
        let Self {
            buf,
            prefix,
            mut groups,
            materialized,
            ..
        } = self;
        groups.clear();
        GROUP_LISTS.give(groups);
        Parts {
            buf,
            prefix,
            materialized,
        }
    }

    fn is_json(&self) -> bool {
        self.config.encoding == Encoding::Json
    }

    /// Encodes a complete record, newline included.
    pub(crate) fn encode_record(mut self, handler: &HandlerInner, record: &Record) -> Parts {
        if self.is_json() {
            self.buf.write_byte(b'{');
        }
        self.append_builtins(record);
        self.append_non_builtins(handler, record);
        self.buf.write_byte(b'\n');
        self.into_parts()
    }

    fn append_builtins(&mut self, record: &Record) {
        self.builtin = true;
        let replace = self.config.opts.replace_attr.is_some();

        if let Some(t) = record.time {
            if replace {
                self.append_attr(&Attr::time(keys::TIME, t));
            } else {
                self.append_key(keys::TIME);
                self.append_time(&t);
            }
        }

        if self.config.encoding == Encoding::Pretty {
            self.color = self.config.colors.color_for(record.level);
        }
        if replace {
            self.append_attr(&Attr::any(keys::LEVEL, record.level));
        } else {
            self.append_key(keys::LEVEL);
            self.append_string(&record.level.display_name());
        }
        self.color = None;

        if self.config.opts.add_source {
            let source = record.source.clone().unwrap_or_default();
            self.append_attr(&Attr::any(keys::SOURCE, source));
        }

        if replace {
            self.append_attr(&Attr::string(keys::MESSAGE, record.message.as_str()));
        } else {
            self.append_key(keys::MESSAGE);
            self.append_string(&record.message);
        }
        self.builtin = false;
    }

    /// Bound attributes, the record's own attributes, then the closing
    /// braces of every group written.
    fn append_non_builtins(&mut self, handler: &HandlerInner, record: &Record) {
        if !handler.preformatted.is_empty() {
            self.buf.write_str(self.sep);
            self.buf.write_bytes(&handler.preformatted);
            self.sep = self.config.attr_sep();
        }
        self.open_handler_groups(handler);
        for attr in record.attrs() {
            self.append_attr(attr);
        }
        if self.is_json() {
            for _ in 0..self.materialized {
                self.buf.write_byte(b'}');
            }
            self.buf.write_byte(b'}');
        }
    }

    /// Stacks the handler's groups; the first `n_open_groups` are already
    /// written into its preformatted bytes.
    pub(crate) fn open_handler_groups(&mut self, handler: &HandlerInner) {
        self.prefix.push_str(&handler.group_prefix);
        self.groups.extend(handler.groups.iter().cloned());
        self.materialized = handler.n_open_groups;
    }

    fn open_group(&mut self, name: &str) {
        self.groups.push(name.to_string());
    }

    fn close_group(&mut self) {
        let Some(name) = self.groups.pop() else {
            return;
        };
        if self.groups.len() < self.materialized {
            self.materialized -= 1;
            if self.is_json() {
                self.buf.write_byte(b'}');
            } else {
                let len = self.prefix.len() - name.len() - KEY_COMPONENT_SEP.len_utf8();
                self.prefix.truncate(len);
            }
            self.sep = self.config.attr_sep();
        }
    }

    /// Writes every stacked group that has not been written yet.
    fn materialize(&mut self) {
        while self.materialized < self.groups.len() {
            let index = self.materialized;
            if self.is_json() {
                self.buf.write_str(self.sep);
                json_string(&mut self.buf, &self.groups[index]);
                self.buf.write_str(":{");
                self.sep = "";
            } else {
                self.prefix.push_str(&self.groups[index]);
                self.prefix.push(KEY_COMPONENT_SEP);
            }
            self.materialized += 1;
        }
    }

    /// Appends `attr`, applying the replace callback and eliding empty
    /// attributes and groups.
    pub(crate) fn append_attr(&mut self, attr: &Attr) {
        let mut attr = Cow::Borrowed(attr);

        let config = self.config;
        if let Some(replace) = config.opts.replace_attr.as_ref() {
            if !matches!(attr.value, Value::Group(_)) {
                let mut owned = attr.into_owned();
                owned.value = owned.value.resolve();
                let groups: &[String] = if self.builtin { &[] } else { &self.groups };
                attr = Cow::Owned(replace(groups, owned));
            }
        }
        if matches!(attr.value, Value::Lazy(_)) {
            let mut owned = attr.into_owned();
            owned.value = owned.value.resolve();
            attr = Cow::Owned(owned);
        }
        if attr.is_empty() {
            return;
        }

        if let Some(source) = attr.value.as_source() {
            let value = if self.is_json() {
                source.group_value()
            } else {
                Value::String(format!("{}:{}", source.file, source.line))
            };
            attr = Cow::Owned(Attr::new(attr.key.clone(), value));
        }

        if let Value::Group(children) = &attr.value {
            // Elision of empty groups falls out of lazy materialization.
            let named = !attr.key.is_empty();
            if named {
                self.open_group(&attr.key);
            }
            for child in children {
                self.append_attr(child);
            }
            if named {
                self.close_group();
            }
        } else {
            self.append_key(&attr.key);
            self.append_value(&attr.value);
        }
    }

    fn append_key(&mut self, key: &str) {
        self.materialize();
        self.buf.write_str(self.sep);
        if self.is_json() {
            json_string(&mut self.buf, key);
            self.buf.write_byte(b':');
        } else if !(self.builtin && self.config.encoding == Encoding::Pretty) {
            let color = self.color.take();
            if self.prefix.is_empty() {
                self.append_string(key);
            } else {
                let mut full = String::with_capacity(self.prefix.len() + key.len());
                full.push_str(&self.prefix);
                full.push_str(key);
                self.append_string(&full);
            }
            self.color = color;
            self.buf.write_byte(b'=');
        }
        self.sep = self.config.attr_sep();
    }

    fn append_string(&mut self, s: &str) {
        if self.is_json() {
            json_string(&mut self.buf, s);
        } else if self.config.safe && needs_quoting(s) {
            append_quoted(&mut self.buf, s.as_bytes());
        } else if let Some(color) = self.color {
            color.paint(&mut self.buf, s.as_bytes());
        } else {
            self.buf.write_str(s);
        }
    }

    fn append_error(&mut self, err: &dyn Display) {
        self.append_string(&format!("!ERROR:{err}"));
    }

    fn append_value(&mut self, value: &Value) {
        let result = if self.is_json() {
            self.append_json_value(value)
        } else {
            self.append_text_value(value)
        };
        if let Err(err) = result {
            self.append_error(&err);
        }
    }

    fn append_text_value(&mut self, value: &Value) -> Result<(), MarshalError> {
        match value {
            Value::String(s) => self.append_string(s),
            Value::Int64(n) => self.buf.write_i64(*n),
            Value::Uint64(n) => self.buf.write_u64(*n),
            Value::Float64(f) => {
                self.buf.render(|b| number::write_float(b, *f));
            }
            Value::Bool(b) => self.buf.write_str(if *b { "true" } else { "false" }),
            Value::Duration(d) => {
                let nanos = d
                    .num_nanoseconds()
                    .ok_or(MarshalError::DurationOverflow(*d))?;
                self.buf.render(|b| number::write_duration(b, nanos));
            }
            Value::Time(t) => self.append_time(t),
            Value::Group(_) => {
                self.buf.render(|b| write!(b, "{value}"));
            }
            Value::Any(None) => self.append_string("<nil>"),
            Value::Any(Some(any)) => {
                if let Some(text) = any.marshal_text() {
                    let text = text.map_err(MarshalError::Capability)?;
                    self.append_string(&text);
                } else if let Some(bytes) = any.as_bytes() {
                    if !self.config.safe && self.config.encoding == Encoding::Pretty {
                        self.buf.write_bytes(bytes);
                    } else {
                        append_quoted(&mut self.buf, bytes);
                    }
                } else if let Some(err) = any.as_error() {
                    self.append_string(&err.to_string());
                } else {
                    self.append_string(&format!("{any:?}"));
                }
            }
            Value::Lazy(_) => return self.append_text_value(&value.clone().resolve()),
        }
        Ok(())
    }

    fn append_json_value(&mut self, value: &Value) -> Result<(), MarshalError> {
        match value {
            Value::String(s) => json_string(&mut self.buf, s),
            Value::Int64(n) => self.buf.write_i64(*n),
            Value::Uint64(n) => self.buf.write_u64(*n),
            Value::Float64(f) => self.write_json_float(*f)?,
            Value::Bool(b) => self.buf.write_str(if *b { "true" } else { "false" }),
            Value::Duration(d) => {
                let nanos = d
                    .num_nanoseconds()
                    .ok_or(MarshalError::DurationOverflow(*d))?;
                self.buf.write_i64(nanos);
            }
            Value::Time(t) => self.append_time(t),
            Value::Group(_) => json_string(&mut self.buf, &value.to_string()),
            Value::Any(None) => self.buf.write_str("null"),
            Value::Any(Some(any)) => {
                if let Some(json) = any.marshal_json() {
                    let json = json.map_err(MarshalError::Capability)?;
                    self.write_json(&json)?;
                } else if let Some(err) = any.as_error() {
                    json_string(&mut self.buf, &err.to_string());
                } else if let Some(bytes) = any.as_bytes() {
                    let encoded = BASE64.encode(bytes);
                    json_string(&mut self.buf, &encoded);
                } else if let Some(text) = any.marshal_text() {
                    let text = text.map_err(MarshalError::Capability)?;
                    json_string(&mut self.buf, &text);
                } else {
                    json_string(&mut self.buf, &format!("{any:?}"));
                }
            }
            Value::Lazy(_) => return self.append_json_value(&value.clone().resolve()),
        }
        Ok(())
    }

    fn write_json_float(&mut self, f: f64) -> Result<(), MarshalError> {
        if !f.is_finite() {
            return Err(MarshalError::UnsupportedFloat(f));
        }
        self.buf.render(|b| number::write_json_float(b, f));
        Ok(())
    }

    /// Re-encodes a serde value with this encoder's escaping and float rules.
    /// The output is written only if the whole value encodes.
    fn write_json(&mut self, json: &serde_json::Value) -> Result<(), MarshalError> {
        let start = self.buf.len();
        let result = self.write_json_inner(json);
        if result.is_err() {
            self.buf.truncate(start);
        }
        result
    }

    fn write_json_inner(&mut self, json: &serde_json::Value) -> Result<(), MarshalError> {
        match json {
            serde_json::Value::Null => self.buf.write_str("null"),
            serde_json::Value::Bool(b) => self.buf.write_str(if *b { "true" } else { "false" }),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    self.buf.write_i64(i);
                } else if let Some(u) = n.as_u64() {
                    self.buf.write_u64(u);
                } else if let Some(f) = n.as_f64() {
                    self.write_json_float(f)?;
                } else {
                    self.buf.write_str(&n.to_string());
                }
            }
            serde_json::Value::String(s) => json_string(&mut self.buf, s),
            serde_json::Value::Array(items) => {
                self.buf.write_byte(b'[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.buf.write_byte(b',');
                    }
                    self.write_json_inner(item)?;
                }
                self.buf.write_byte(b']');
            }
            serde_json::Value::Object(map) => {
                self.buf.write_byte(b'{');
                for (i, (key, item)) in map.iter().enumerate() {
                    if i > 0 {
                        self.buf.write_byte(b',');
                    }
                    json_string(&mut self.buf, key);
                    self.buf.write_byte(b':');
                    self.write_json_inner(item)?;
                }
                self.buf.write_byte(b'}');
            }
        }
        Ok(())
    }

    fn append_time(&mut self, t: &DateTime<FixedOffset>) {
        match self.config.encoding {
            Encoding::Pretty => {
                if let Err(err) = time::write_layout(&mut self.buf, t, &self.config.layout) {
                    self.append_error(&err);
                }
            }
            _ if !time::in_rfc3339_range(t) => {
                self.append_error(&MarshalError::YearOutOfRange);
            }
            Encoding::Json => {
                self.buf.write_byte(b'"');
                time::write_rfc3339_nano(&mut self.buf, t);
                self.buf.write_byte(b'"');
            }
            Encoding::Text => time::write_rfc3339_millis(&mut self.buf, t),
        }
    }
}

fn json_string(buf: &mut Buffer, s: &str) {
    buf.write_byte(b'"');
    append_escaped_json(buf, s);
    buf.write_byte(b'"');
}
