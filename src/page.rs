use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::dispatch::{FilePart, FormData};
use crate::error::{Error, Result};
use crate::notify::FlashBoard;
use crate::render::{ColumnSpec, Table};

pub type Selector = &'static str;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Control {
    pub spinner_visible: bool,
    /// Number of show / hide toggles received.
    pub shown: u32,
    pub hidden: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Form {
    pub fields: BTreeMap<String, String>,
    #[serde(skip)]
    pub file: Option<FilePart>,
}

impl Form {
    pub fn set(&mut self, name: &str, value: &str) {
        self.fields.insert(name.to_string(), value.to_string());
    }

    pub fn attach(&mut self, field: &str, file_name: &str, bytes: Vec<u8>) {
        self.file = Some(FilePart {
            field: field.to_string(),
            file_name: file_name.to_string(),
            bytes,
        });
    }

    pub fn reset(&mut self) {
        self.fields.clear();
        self.file = None;
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.file.is_none()
    }

    pub fn to_form_data(&self) -> FormData {
        let mut data = FormData::new();
        for (name, value) in &self.fields {
            data = data.text(name, value);
        }
        if let Some(file) = &self.file {
            data = data.file(&file.field, &file.file_name, file.bytes.clone());
        }
        data
    }
}

/// A container shown only while its table has rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Section {
    pub table: Selector,
    pub visible: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Download {
    pub url: String,
    pub path: PathBuf,
}

#[derive(Debug, Default, Serialize)]
pub struct Page {
    pub tables: BTreeMap<Selector, Table>,
    pub sections: BTreeMap<Selector, Section>,
    pub images: BTreeMap<Selector, String>,
    pub controls: BTreeMap<Selector, Control>,
    pub forms: BTreeMap<Selector, Form>,
    pub checkboxes: BTreeMap<Selector, bool>,
    pub modals: BTreeMap<Selector, bool>,
    pub texts: BTreeMap<String, String>,
    pub flash: FlashBoard,
    pub downloads: Vec<Download>,
    #[serde(skip)]
    last_cache_buster: i64,
}

impl Page {
    pub fn new(flash: FlashBoard) -> Self {
        Self {
            flash,
            ..Self::default()
        }
    }

    pub fn mount_table(&mut self, selector: Selector, columns: &[ColumnSpec]) {
        self.tables
            .entry(selector)
            .or_insert_with(|| Table::new(columns));
    }

    pub fn mount_section(&mut self, selector: Selector, table: Selector) {
        self.sections.entry(selector).or_insert(Section {
            table,
            visible: false,
        });
    }

    pub fn mount_image(&mut self, selector: Selector, src: &str) {
        self.images
            .entry(selector)
            .or_insert_with(|| src.to_string());
    }

    pub fn mount_control(&mut self, selector: Selector) {
        self.controls.entry(selector).or_default();
    }

    pub fn mount_form(&mut self, selector: Selector) {
        self.forms.entry(selector).or_default();
    }

    pub fn mount_checkbox(&mut self, selector: Selector) {
        self.checkboxes.entry(selector).or_insert(false);
    }

    pub fn mount_modal(&mut self, selector: Selector) {
        self.modals.entry(selector).or_insert(false);
    }

    pub fn table(&self, selector: &str) -> Option<&Table> {
        self.tables.get(selector)
    }

    pub fn table_len(&self, selector: &str) -> usize {
        self.table(selector).map(Table::len).unwrap_or(0)
    }

    pub fn table_mut(&mut self, selector: &str) -> Option<&mut Table> {
        self.tables.get_mut(selector)
    }

    pub fn clear_table(&mut self, selector: &str) {
        if let Some(table) = self.tables.get_mut(selector) {
            table.clear();
        }
    }

    pub fn is_section_visible(&self, selector: &str) -> bool {
        self.sections
            .get(selector)
            .map(|section| section.visible)
            .unwrap_or(false)
    }

    pub fn image_src(&self, selector: &str) -> Option<&str> {
        self.images.get(selector).map(String::as_str)
    }

    pub fn set_image_src(&mut self, selector: Selector, src: String) {
        self.images.insert(selector, src);
    }

    pub fn control(&self, selector: &str) -> Option<&Control> {
        self.controls.get(selector)
    }

    pub fn control_mut(&mut self, selector: Selector) -> &mut Control {
        self.controls.entry(selector).or_default()
    }

    pub fn form(&self, selector: &str) -> Option<&Form> {
        self.forms.get(selector)
    }

    pub fn form_mut(&mut self, selector: &str) -> Result<&mut Form> {
        self.forms
            .get_mut(selector)
            .ok_or_else(|| Error::UnknownForm(selector.to_string()))
    }

    pub fn set_checked(&mut self, selector: Selector, checked: bool) {
        self.checkboxes.insert(selector, checked);
    }

    pub fn is_checked(&self, selector: &str) -> bool {
        self.checkboxes.get(selector).copied().unwrap_or(false)
    }

    pub fn open_modal(&mut self, selector: Selector) {
        self.modals.insert(selector, true);
    }

    pub fn close_modal(&mut self, selector: Selector) {
        self.modals.insert(selector, false);
    }

    pub fn is_modal_open(&self, selector: &str) -> bool {
        self.modals.get(selector).copied().unwrap_or(false)
    }

    pub fn open_modals(&self) -> impl Iterator<Item = Selector> + '_ {
        self.modals
            .iter()
            .filter(|(_, open)| **open)
            .map(|(selector, _)| *selector)
    }

    pub fn set_text(&mut self, slot: &str, value: String) {
        self.texts.insert(slot.to_string(), value);
    }

    pub fn text(&self, slot: &str) -> Option<&str> {
        self.texts.get(slot).map(String::as_str)
    }

    /// Millisecond timestamp for image urls, strictly increasing within the
    /// page even when two refreshes land in the same millisecond.
    pub fn next_cache_buster(&mut self, now_ms: i64) -> i64 {
        let value = now_ms.max(self.last_cache_buster + 1);
        self.last_cache_buster = value;
        value
    }
}
