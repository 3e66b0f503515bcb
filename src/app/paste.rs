use std::io::Cursor;

use gtk4::gdk;
use gtk4::prelude::*;
use image::{ImageFormat, RgbaImage};

use crate::acquisition::ClipboardItem;

const MIME_IMAGE_PNG: &str = "image/png";

/// Re-encodes a clipboard texture as PNG so it passes through the regular
/// paste validation.
pub(super) fn texture_to_clipboard_item(texture: &gdk::Texture) -> Option<ClipboardItem> {
    let width = u32::try_from(texture.width()).ok()?;
    let height = u32::try_from(texture.height()).ok()?;
    let stride = width as usize * 4;
    let mut data = vec![0u8; stride * height as usize];
    texture.download(&mut data, stride);

    match argb32_to_png(width, height, &data) {
        Some(png) => Some(ClipboardItem {
            mime_type: MIME_IMAGE_PNG.to_string(),
            data: png,
        }),
        None => {
            tracing::warn!(width, height, "failed to encode pasted texture");
            None
        }
    }
}

/// Converts premultiplied native-endian ARGB32 (what `gdk::Texture::download`
/// produces) into PNG bytes.
pub(super) fn argb32_to_png(width: u32, height: u32, data: &[u8]) -> Option<Vec<u8>> {
    let mut rgba = Vec::with_capacity(data.len());
    for pixel in data.chunks_exact(4) {
        let argb = u32::from_ne_bytes([pixel[0], pixel[1], pixel[2], pixel[3]]);
        let alpha = (argb >> 24) as u8;
        let unpremultiply = |channel: u32| -> u8 {
            let channel = (channel & 0xff) as u8;
            if alpha == 0 {
                0
            } else {
                ((u16::from(channel) * 255 + u16::from(alpha) / 2) / u16::from(alpha)).min(255)
                    as u8
            }
        };
        rgba.extend_from_slice(&[
            unpremultiply(argb >> 16),
            unpremultiply(argb >> 8),
            unpremultiply(argb),
            alpha,
        ]);
    }

    let image = RgbaImage::from_raw(width, height, rgba)?;
    let mut png = Cursor::new(Vec::new());
    image.write_to(&mut png, ImageFormat::Png).ok()?;
    Some(png.into_inner())
}
