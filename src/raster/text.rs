//! Human readable text, drawn with the `embedded-graphics` mono fonts.

use super::canvas::Canvas;

/// Height of a line of text at font factor 1, in pixels.
pub const FONT_HEIGHT: i32 = 10;

/// Integer magnification of the font for a scale.
pub fn font_factor(scale: f32) -> i32 {
    (scale.round() as i32).max(1)
}

#[cfg(feature = "embedded-graphics")]
mod glyphs {
    use core::convert::Infallible;

    use embedded_graphics::{
        mono_font::{iso_8859_1::FONT_6X10, MonoTextStyle},
        pixelcolor::BinaryColor,
        prelude::*,
        text::{Alignment, Baseline, Text, TextStyleBuilder},
    };

    use super::super::canvas::{Canvas, INK};

    /// Draw target magnifying every font pixel into a `factor` square on the
    /// canvas, relative to `origin`.
    struct Magnified<'a> {
        canvas: &'a mut Canvas,
        origin: Point,
        factor: i32,
    }

    impl OriginDimensions for Magnified<'_> {
        fn size(&self) -> Size {
            Size::new(self.canvas.width() as u32, self.canvas.height() as u32)
        }
    }

    impl DrawTarget for Magnified<'_> {
        type Color = BinaryColor;
        type Error = Infallible;

        fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            for Pixel(point, colour) in pixels {
                if colour.is_on() {
                    let x = self.origin.x + point.x * self.factor;
                    let y = self.origin.y + point.y * self.factor;
                    self.canvas.fill_rect(x, y, self.factor, self.factor, INK);
                }
            }
            Ok(())
        }
    }

    pub fn draw(canvas: &mut Canvas, text: &str, centre_x: i32, top: i32, factor: i32) {
        let mut target = Magnified { canvas, origin: Point::new(centre_x, top), factor };
        let character_style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
        let text_style = TextStyleBuilder::new().alignment(Alignment::Center).baseline(Baseline::Top).build();
        let _ = Text::with_text_style(text, Point::zero(), character_style, text_style).draw(&mut target);
    }
}

/// Draw `text` centred on `centre_x` with its top at `top`. Without the
/// `embedded-graphics` feature nothing is drawn, the space stays reserved.
pub fn draw_text(canvas: &mut Canvas, text: &str, centre_x: i32, top: i32, factor: i32) {
    log::trace!("text {:?} at ({}, {}) x{}", text, centre_x, top, factor);
    #[cfg(feature = "embedded-graphics")]
    glyphs::draw(canvas, text, centre_x, top, factor);
    #[cfg(not(feature = "embedded-graphics"))]
    let _ = canvas;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::canvas::INK;
    use crate::raster::Rotation;

    #[test]
    fn test_font_factor() {
        assert_eq!(font_factor(0.5), 1);
        assert_eq!(font_factor(1.0), 1);
        assert_eq!(font_factor(1.4), 1);
        assert_eq!(font_factor(2.5), 3);
        assert_eq!(font_factor(10.0), 10);
    }

    #[cfg(feature = "embedded-graphics")]
    #[test]
    fn test_draw_text_inside_box() {
        let mut canvas = Canvas::new(40, 30);
        draw_text(&mut canvas, "8", 20, 5, 2);
        let (mut min_x, mut max_x, mut min_y, mut max_y) = (usize::MAX, 0, usize::MAX, 0);
        for y in 0..canvas.height() {
            for x in 0..canvas.width() {
                if canvas.get(x, y) == INK {
                    min_x = min_x.min(x);
                    max_x = max_x.max(x);
                    min_y = min_y.min(y);
                    max_y = max_y.max(y);
                }
            }
        }
        // a 6x10 cell magnified twice, centred on x = 20
        assert!(min_x >= 14 && max_x < 26, "{}..{}", min_x, max_x);
        assert!(min_y >= 5 && max_y < 25, "{}..{}", min_y, max_y);
        assert!(canvas.pixels(Rotation::R0).filter(|&p| p == INK).count() > 0);
    }

    #[cfg(feature = "embedded-graphics")]
    #[test]
    fn test_draw_text_clipped() {
        let mut canvas = Canvas::new(4, 4);
        draw_text(&mut canvas, "0123456789", 2, -3, 1);
        assert_eq!(canvas.width(), 4);
    }
}
