//! The extraction pipeline: decoded page to [`ExtractionResult`].

use std::collections::BTreeMap;

use cuttermap_core::{
    CutterMapError, ExtractOptions, ExtractionResult, ExtractionStats, GroupIconMatch, Icon,
    IconCache, IconDecoder, ImageSet, PageRegions, assign_fill_colors, extract_blades, extract_bom,
    extract_header, extract_legend, match_images, raw_text, validate,
};
use tracing::{debug, info};

use crate::decoder::{DecodedPage, decode_page};
use crate::icons::PngIconDecoder;

/// Runs every extractor over one page.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    options: ExtractOptions,
}

impl Extractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Decode the first page of `bytes` and extract it.
    ///
    /// # Errors
    ///
    /// Fails only when the document or its first page cannot be opened.
    pub fn extract(&self, bytes: &[u8]) -> Result<ExtractionResult, CutterMapError> {
        let decoded = decode_page(bytes, &self.options.decode)?;
        Ok(self.extract_decoded(decoded))
    }

    /// Extract an already decoded page, producing PNG icons.
    pub fn extract_decoded(&self, decoded: DecodedPage) -> ExtractionResult {
        self.extract_with(decoded, PngIconDecoder)
    }

    /// Extract an already decoded page with a custom icon decoder.
    pub fn extract_with<D: IconDecoder>(&self, decoded: DecodedPage, decoder: D) -> ExtractionResult {
        let opts = &self.options;
        let page = &decoded.content;
        let header_band = opts.header.header_band;

        let header = extract_header(&page.runs, &page.words, &opts.header);
        let bom = extract_bom(&page.words, header_band, &opts.bom);
        // Blades and cutter icons live below both the header and the BOM.
        let layout_top = bom.bottom.map_or(header_band, |b| b.max(header_band));
        debug!(layout_top, "layout region");

        let blades = extract_blades(
            &page.words,
            layout_top,
            page.size.height,
            &bom.rows,
            &opts.blade,
        );
        let legend = extract_legend(&page.words, &opts.legend);

        let mut summary = bom.rows;
        let fill_source = assign_fill_colors(
            &mut summary,
            &page.shapes,
            bom.header_y,
            bom.row_height,
            &opts.palette,
        );

        let indices: Vec<u32> = summary.iter().map(|r| r.index).collect();
        let regions = PageRegions {
            size: page.size,
            header_band,
            layout_top,
        };
        let matches = match_images(
            &page.images,
            &page.words,
            &indices,
            &legend.rows,
            &regions,
            &opts.images,
        );

        let mut icons = IconCache::new(decoder, &page.images);
        let cutter_shapes: BTreeMap<u32, Icon> = matches
            .cutter_shapes
            .iter()
            .filter_map(|(index, hash)| icons.get(hash).map(|icon| (*index, icon)))
            .collect();
        let drill_bit = matches.drill_bit.as_deref().and_then(|h| icons.get(h));
        let logo = matches.logo.as_deref().and_then(|h| icons.get(h));
        let group_icons: Vec<GroupIconMatch> = matches
            .group_icons
            .iter()
            .filter_map(|(row, hash)| {
                let legend_row = legend.rows.get(*row)?;
                Some(GroupIconMatch {
                    groups: legend_row.groups.clone(),
                    y: legend_row.y,
                    icon: icons.get(hash)?,
                })
            })
            .collect();
        let decoded_icons = icons.decodes();

        let validation = validate(&summary, &blades);
        let mut warnings = decoded.warnings;
        warnings.extend(icons.into_warnings());

        let extraction_stats = ExtractionStats {
            runs: page.runs.len(),
            words: page.words.len(),
            shapes: page.shapes.len(),
            images: decoded.placements,
            unique_images: page.images.len(),
            decoded_icons,
            bom_rows: summary.len(),
            blades: blades.len(),
            cells: blades.iter().map(|b| b.cells().count()).sum(),
            fill_source,
            warnings,
        };
        info!(
            bom_rows = extraction_stats.bom_rows,
            blades = extraction_stats.blades,
            cells = extraction_stats.cells,
            valid = validation.is_valid,
            warnings = extraction_stats.warnings.len(),
            "extraction complete"
        );

        ExtractionResult {
            header,
            summary,
            groups: legend.groups(),
            has_group_legend: legend.has_legend(),
            group_format: legend.format,
            group_rows: legend.rows.clone(),
            blades,
            images: ImageSet {
                drill_bit: drill_bit.clone(),
                logo,
                group_icons,
            },
            cutter_shapes,
            drill_bit_image: drill_bit,
            validation,
            raw_text: raw_text(&page.words),
            extraction_stats,
            page: page.size,
        }
    }
}

/// Extract a cutter map from PDF bytes with the given options.
///
/// # Errors
///
/// Fails only when the document or its first page cannot be opened.
pub fn extract(bytes: &[u8], options: &ExtractOptions) -> Result<ExtractionResult, CutterMapError> {
    Extractor::new(options.clone()).extract(bytes)
}

#[cfg(test)]
mod tests {
    use cuttermap_core::{FillSource, PageContent, PageSize};

    use super::*;

    #[test]
    fn empty_page_yields_defaults() {
        let decoded = DecodedPage {
            content: PageContent {
                size: PageSize {
                    width: 792.0,
                    height: 612.0,
                },
                ..Default::default()
            },
            ..Default::default()
        };
        let result = Extractor::default().extract_decoded(decoded);
        assert!(result.header.is_empty());
        assert!(result.summary.is_empty());
        assert!(result.blades.is_empty());
        assert!(!result.has_group_legend);
        assert!(result.validation.is_valid);
        assert_eq!(result.extraction_stats.fill_source, FillSource::Empty);
        assert_eq!(result.page.width, 792.0);
        assert!(result.cutter_shapes.is_empty());
    }
}
