use crate::geometry::BBox;
use crate::images::RasterImage;
use crate::shapes::Shape;
use crate::text::TextRun;
use crate::words::Word;

/// Page dimensions in points.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl Default for PageSize {
    /// US Letter portrait.
    fn default() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
        }
    }
}

/// Everything decoded from one page, in top-left origin coordinates.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    pub size: PageSize,
    /// Style runs, in content stream order.
    pub runs: Vec<TextRun>,
    /// Raw tokens, top to bottom then left to right.
    pub words: Vec<Word>,
    pub shapes: Vec<Shape>,
    /// Unique images (by content hash) with their placements.
    pub images: Vec<RasterImage>,
}

impl PageContent {
    /// Words whose vertical center lies within `[top, bottom)`.
    pub fn words_between(&self, top: f64, bottom: f64) -> Vec<&Word> {
        self.words
            .iter()
            .filter(|w| {
                let y = w.center_y();
                y >= top && y < bottom
            })
            .collect()
    }

    /// Words whose center falls inside `area`.
    pub fn words_in(&self, area: &BBox) -> Vec<&Word> {
        self.words
            .iter()
            .filter(|w| area.contains_point(w.bbox.center()))
            .collect()
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, top: f64) -> Word {
        Word::new(text, BBox::new(10.0, top, 20.0, top + 10.0))
    }

    #[test]
    fn words_between_uses_center() {
        let page = PageContent {
            words: vec![word("a", 0.0), word("b", 50.0), word("c", 100.0)],
            ..Default::default()
        };
        let found: Vec<&str> = page
            .words_between(4.0, 60.0)
            .iter()
            .map(|w| w.text.as_str())
            .collect();
        assert_eq!(found, vec!["a", "b"]);
        assert_eq!(page.words_in(&BBox::new(0.0, 90.0, 30.0, 120.0)).len(), 1);
    }
}
