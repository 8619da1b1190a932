//! # Host Page Interface
//!
//! The foreign page is an external collaborator. This module defines the
//! narrow surface the engine needs from it:
//!
//! - [`Region`]: one discovered content region (a "tool" before extraction),
//!   with an id, a type tag and optionally the markup of its text-bearing
//!   subregion.
//! - [`RegionHandle`]: the live-markup operations span reconciliation needs.
//! - [`HostPage`]: discovery, structure snapshot/restore and listing display
//!   for the view state controller.
//!
//! [`MemoryPage`] implements [`HostPage`] over plain data. The CLI builds one
//! from a JSON page capture; tests build them directly.

use crate::model::Position;
use crate::reconcile::MarkerBinding;
use crate::view::TextOnlyListing;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Live markup operations on one rendered region.
pub trait RegionHandle {
    fn region_id(&self) -> &str;

    /// Current markup of the text-bearing subregion ("" when there is none).
    fn live_markup(&self) -> &str;

    /// Replace the live markup. Previously bound markers are discarded.
    fn replace_markup(&mut self, markup: String);

    /// Attach the click behavior for one highlight marker.
    fn bind_marker(&mut self, binding: MarkerBinding);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub id: String,
    #[serde(rename = "type", default)]
    pub region_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub data_attributes: BTreeMap<String, String>,
    /// Markup of the nested text-bearing subregion, if discovery found one.
    #[serde(default)]
    pub text_markup: Option<String>,
    #[serde(skip)]
    pub bindings: Vec<MarkerBinding>,
}

impl Region {
    pub fn new(id: impl Into<String>, region_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            region_type: region_type.into(),
            title: String::new(),
            class_name: String::new(),
            position: Position::default(),
            data_attributes: BTreeMap::new(),
            text_markup: None,
            bindings: Vec::new(),
        }
    }

    pub fn with_text_markup(mut self, markup: impl Into<String>) -> Self {
        self.text_markup = Some(markup.into());
        self
    }

    pub fn binding(&self, span_id: &str) -> Option<&MarkerBinding> {
        self.bindings.iter().find(|b| b.span_id == span_id)
    }
}

impl RegionHandle for Region {
    fn region_id(&self) -> &str {
        &self.id
    }

    fn live_markup(&self) -> &str {
        self.text_markup.as_deref().unwrap_or("")
    }

    fn replace_markup(&mut self, markup: String) {
        self.text_markup = Some(markup);
        self.bindings.clear();
    }

    fn bind_marker(&mut self, binding: MarkerBinding) {
        self.bindings.retain(|b| b.span_id != binding.span_id);
        self.bindings.push(binding);
    }
}

/// Where a page sits in the exposition/weave hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLocation {
    pub exposition_id: String,
    pub weave_id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub page_title: String,
}

impl PageLocation {
    pub fn new(exposition_id: impl Into<String>, weave_id: impl Into<String>) -> Self {
        Self {
            exposition_id: exposition_id.into(),
            weave_id: weave_id.into(),
            url: String::new(),
            page_title: String::new(),
        }
    }
}

pub trait HostPage {
    /// Opaque copy of the page structure, restorable verbatim.
    type Snapshot: Clone;

    fn location(&self) -> &PageLocation;

    /// Currently discoverable regions, in page order.
    fn regions(&self) -> &[Region];

    fn regions_mut(&mut self) -> &mut [Region];

    fn snapshot_structure(&self) -> Self::Snapshot;

    fn restore_structure(&mut self, snapshot: Self::Snapshot);

    /// Tear down the page structure and show `listing` instead.
    fn show_listing(&mut self, listing: TextOnlyListing);
}

/// A page capture as handed over by the host: location plus regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCapture {
    #[serde(flatten)]
    pub location: PageLocation,
    #[serde(default)]
    pub regions: Vec<Region>,
}

#[derive(Debug, Clone)]
pub struct MemoryPage {
    location: PageLocation,
    regions: Vec<Region>,
    listing: Option<TextOnlyListing>,
}

impl MemoryPage {
    pub fn new(location: PageLocation, regions: Vec<Region>) -> Self {
        Self {
            location,
            regions,
            listing: None,
        }
    }

    /// The listing shown while the page is in text-only view.
    pub fn listing(&self) -> Option<&TextOnlyListing> {
        self.listing.as_ref()
    }

    pub fn region(&self, id: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }

    pub fn region_mut(&mut self, id: &str) -> Option<&mut Region> {
        self.regions.iter_mut().find(|r| r.id == id)
    }
}

impl From<PageCapture> for MemoryPage {
    fn from(capture: PageCapture) -> Self {
        Self::new(capture.location, capture.regions)
    }
}

impl HostPage for MemoryPage {
    type Snapshot = Vec<Region>;

    fn location(&self) -> &PageLocation {
        &self.location
    }

    fn regions(&self) -> &[Region] {
        &self.regions
    }

    fn regions_mut(&mut self) -> &mut [Region] {
        &mut self.regions
    }

    fn snapshot_structure(&self) -> Vec<Region> {
        self.regions.clone()
    }

    fn restore_structure(&mut self, snapshot: Vec<Region>) {
        self.regions = snapshot;
        self.listing = None;
    }

    fn show_listing(&mut self, listing: TextOnlyListing) {
        self.regions.clear();
        self.listing = Some(listing);
    }
}
