//! Image placement classification and icon matching.
//!
//! Images are identified by content hash. Matching works on placements and
//! yields hashes; [`IconCache`] turns a hash into a decoded [`Icon`] at most
//! once per extraction, however many placements share it.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::anchor::{nearest_point_within, nearest_within};
use crate::error::{CutterMapError, ExtractWarning, ExtractWarningCode};
use crate::geometry::BBox;
use crate::images::RasterImage;
use crate::legend::LegendRow;
use crate::model::Icon;
use crate::options::ImageMatchOptions;
use crate::page::PageSize;
use crate::words::Word;

/// What a placement is, judged by its size and where it sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlacementCategory {
    /// Large picture of the bit face, top right.
    DrillBit,
    /// Small icon beside a group legend row, above the layout.
    GroupIcon,
    /// Cutter shape icon in the layout area.
    CutterIcon,
    /// Company logo, top left inside the header band.
    Logo,
    Other,
}

/// Where the page regions begin, top-left origin.
#[derive(Debug, Clone, Copy)]
pub struct PageRegions {
    pub size: PageSize,
    pub header_band: f64,
    /// Top of the cutter-layout area.
    pub layout_top: f64,
}

pub fn classify_placement(
    bbox: &BBox,
    regions: &PageRegions,
    options: &ImageMatchOptions,
) -> PlacementCategory {
    let short = bbox.width().min(bbox.height());
    let long = bbox.width().max(bbox.height());
    let page_w = regions.size.width;

    if bbox.top < regions.header_band && bbox.x1 <= page_w * options.logo_max_x_ratio {
        return PlacementCategory::Logo;
    }
    if short >= options.drill_bit_min_side
        && bbox.center_x() >= page_w / 2.0
        && bbox.center_y() < regions.size.height / 2.0
    {
        return PlacementCategory::DrillBit;
    }
    if bbox.center_y() >= regions.layout_top
        && short >= options.cutter_icon_min_side
        && long <= options.cutter_icon_max_side
    {
        return PlacementCategory::CutterIcon;
    }
    let band_x = bbox.center_x() / page_w;
    if bbox.center_y() < regions.layout_top
        && bbox.top >= regions.header_band
        && long <= options.group_icon_max_side
        && (options.group_icon_min_x_ratio..=options.group_icon_max_x_ratio).contains(&band_x)
    {
        return PlacementCategory::GroupIcon;
    }
    PlacementCategory::Other
}

/// A classified placement of one image.
#[derive(Debug, Clone)]
struct Candidate<'a> {
    hash: &'a str,
    bbox: BBox,
}

/// Hashes chosen for each icon slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageMatches {
    pub drill_bit: Option<String>,
    pub logo: Option<String>,
    /// BOM index to cutter icon hash.
    pub cutter_shapes: BTreeMap<u32, String>,
    /// Legend row position (into the legend's rows) to icon hash.
    pub group_icons: Vec<(usize, String)>,
}

impl ImageMatches {
    /// Every hash referenced by a match.
    pub fn hashes(&self) -> impl Iterator<Item = &str> {
        self.drill_bit
            .iter()
            .chain(self.logo.iter())
            .chain(self.cutter_shapes.values())
            .chain(self.group_icons.iter().map(|(_, h)| h))
            .map(String::as_str)
    }
}

/// Match images to BOM indices, legend rows and the fixed slots.
///
/// `indices` are the BOM indices to look for; index tokens are read from
/// `words` below the layout top.
pub fn match_images(
    images: &[RasterImage],
    words: &[Word],
    indices: &[u32],
    legend_rows: &[LegendRow],
    regions: &PageRegions,
    options: &ImageMatchOptions,
) -> ImageMatches {
    let mut by_category: HashMap<PlacementCategory, Vec<Candidate>> = HashMap::new();
    for image in images {
        for bbox in &image.placements {
            let category = classify_placement(bbox, regions, options);
            by_category.entry(category).or_default().push(Candidate {
                hash: &image.hash,
                bbox: *bbox,
            });
        }
    }
    let slot = |c: PlacementCategory| by_category.get(&c).map(Vec::as_slice).unwrap_or(&[]);

    let drill_bit = slot(PlacementCategory::DrillBit)
        .iter()
        .max_by(|a, b| {
            let area = |c: &Candidate| c.bbox.width() * c.bbox.height();
            area(a).total_cmp(&area(b))
        })
        .map(|c| c.hash.to_string());
    let logo = slot(PlacementCategory::Logo)
        .first()
        .map(|c| c.hash.to_string());

    let cutter_icons = slot(PlacementCategory::CutterIcon);
    let mut tokens: Vec<&Word> = words
        .iter()
        .filter(|w| w.center_y() >= regions.layout_top)
        .collect();
    tokens.sort_by(|a, b| {
        a.bbox
            .top
            .total_cmp(&b.bbox.top)
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });
    let mut cutter_shapes = BTreeMap::new();
    for &index in indices {
        let hit = tokens
            .iter()
            .filter(|w| w.as_int() == Some(index))
            .find_map(|w| {
                let center = w.bbox.center();
                cutter_icons
                    .iter()
                    .find(|c| c.bbox.contains_point(center))
                    .or_else(|| {
                        nearest_point_within(cutter_icons, center, options.match_radius, |c| {
                            c.bbox.center()
                        })
                    })
            });
        if let Some(c) = hit {
            cutter_shapes.insert(index, c.hash.to_string());
        }
    }

    let group_slots = slot(PlacementCategory::GroupIcon);
    let group_icons: Vec<(usize, String)> = legend_rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| {
            nearest_within(group_slots, row.y, options.legend_icon_tolerance, |c| {
                c.bbox.center_y()
            })
            .map(|c| (i, c.hash.to_string()))
        })
        .collect();

    debug!(
        cutter_shapes = cutter_shapes.len(),
        group_icons = group_icons.len(),
        drill_bit = drill_bit.is_some(),
        logo = logo.is_some(),
        "image matches"
    );
    ImageMatches {
        drill_bit,
        logo,
        cutter_shapes,
        group_icons,
    }
}

/// Turns raw image resources into icons.
pub trait IconDecoder {
    fn decode(&self, image: &RasterImage) -> Result<Icon, CutterMapError>;
}

/// Decodes each image hash at most once.
///
/// Failures are remembered as well, so a broken image produces one warning
/// no matter how often it is requested.
pub struct IconCache<'a, D> {
    decoder: D,
    images: HashMap<&'a str, &'a RasterImage>,
    decoded: HashMap<String, Option<Icon>>,
    decodes: usize,
    warnings: Vec<ExtractWarning>,
}

impl<'a, D: IconDecoder> IconCache<'a, D> {
    pub fn new(decoder: D, images: &'a [RasterImage]) -> Self {
        Self {
            decoder,
            images: images.iter().map(|i| (i.hash.as_str(), i)).collect(),
            decoded: HashMap::new(),
            decodes: 0,
            warnings: Vec::new(),
        }
    }

    /// The icon for `hash`, decoding it on first use.
    pub fn get(&mut self, hash: &str) -> Option<Icon> {
        if let Some(icon) = self.decoded.get(hash) {
            return icon.clone();
        }
        let icon = match self.images.get(hash) {
            Some(image) => {
                self.decodes += 1;
                match self.decoder.decode(image) {
                    Ok(icon) => Some(icon),
                    Err(err) => {
                        warn!(hash, %err, "icon decode failed");
                        self.warnings.push(
                            ExtractWarning::with_code(
                                ExtractWarningCode::IconDecodeFailed,
                                err.to_string(),
                            )
                            .for_element(format!("image {}", short_hash(hash))),
                        );
                        None
                    }
                }
            }
            None => None,
        };
        self.decoded.insert(hash.to_string(), icon.clone());
        icon
    }

    /// How many decode attempts were made.
    pub fn decodes(&self) -> usize {
        self.decodes
    }

    pub fn into_warnings(self) -> Vec<ExtractWarning> {
        self.warnings
    }
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
