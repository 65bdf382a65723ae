//! Отрисовка неподвижного кадра с подписью перед захватом поверхности.

use log::debug;

use crate::error::Result;
use crate::media::StillComposite;
use crate::media::runtime::{DrawingSurface, Rect, Rgba, TextAlign, TextStyle};

/// Высота полупрозрачной полосы под подписью, в пикселях
pub const CAPTION_BAND_HEIGHT: f64 = 200.0;
/// Цвет полосы под подписью
pub const CAPTION_BAND_COLOR: Rgba = Rgba { r: 0, g: 0, b: 0, a: 0.6 };
/// Шрифт подписи
pub const CAPTION_FONT: &str = "bold 48px Inter, sans-serif";
/// Подпись по умолчанию
pub const DEFAULT_CAPTION: &str = "VoxStudio AI";

/// Прямоугольник, в который изображение вписывается с заполнением (cover) и центрированием
pub fn cover_rect(image_width: u32, image_height: u32, canvas_width: u32, canvas_height: u32) -> Rect {
    let (iw, ih) = (image_width as f64, image_height as f64);
    let (cw, ch) = (canvas_width as f64, canvas_height as f64);
    let scale = (cw / iw).max(ch / ih);
    let (width, height) = (iw * scale, ih * scale);
    Rect {
        x: (cw - width) / 2.0,
        y: (ch - height) / 2.0,
        width,
        height,
    }
}

/// Нарисовать изображение и подпись на поверхности в размере кадра.
///
/// Должно завершиться до начала захвата поверхности.
pub fn compose(surface: &dyn DrawingSurface, still: &StillComposite) -> Result<()> {
    let (width, height) = still.aspect.dimensions();
    surface.resize(width, height);

    let image = surface.load_image(&still.image)?;
    surface.draw_image(&still.image, cover_rect(image.width, image.height, width, height))?;

    let (w, h) = (width as f64, height as f64);
    surface.fill_rect(
        Rect { x: 0.0, y: h - CAPTION_BAND_HEIGHT, width: w, height: CAPTION_BAND_HEIGHT },
        CAPTION_BAND_COLOR,
    );

    let caption = still
        .caption
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CAPTION);
    let style = TextStyle {
        font: CAPTION_FONT.to_string(),
        color: Rgba::WHITE,
        align: TextAlign::Center,
    };
    surface.fill_text(caption, w / 2.0, h - CAPTION_BAND_HEIGHT / 2.0, &style);

    debug!("Composited {}x{} still with caption {:?}", width, height, caption);
    Ok(())
}
