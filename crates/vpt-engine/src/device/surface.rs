use winit::dpi::PhysicalSize;

use super::SurfaceErrorAction;

/// Picks a surface format with the requested encoding, falling back to the
/// first supported one.
pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    srgb: bool,
) -> Option<wgpu::TextureFormat> {
    let preferred = if srgb {
        [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ]
    } else {
        [wgpu::TextureFormat::Bgra8Unorm, wgpu::TextureFormat::Rgba8Unorm]
    };
    preferred
        .into_iter()
        .find(|f| caps.formats.contains(f))
        .or_else(|| caps.formats.first().copied())
}

pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// Zero-sized windows (minimized) keep the old configuration.
pub(crate) fn apply_resize(
    surface: &wgpu::Surface,
    device: &wgpu::Device,
    config: &mut wgpu::SurfaceConfiguration,
    size: &mut PhysicalSize<u32>,
    new_size: PhysicalSize<u32>,
) {
    *size = new_size;
    if new_size.width == 0 || new_size.height == 0 {
        return;
    }
    config.width = new_size.width;
    config.height = new_size.height;
    surface.configure(device, config);
}

pub(crate) fn map_surface_error(
    surface: &wgpu::Surface,
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    err: wgpu::SurfaceError,
) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
            if size.width > 0 && size.height > 0 {
                surface.configure(device, config);
            }
            SurfaceErrorAction::Reconfigured
        }
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(formats: Vec<wgpu::TextureFormat>) -> wgpu::SurfaceCapabilities {
        wgpu::SurfaceCapabilities {
            formats,
            present_modes: vec![wgpu::PresentMode::Fifo],
            alpha_modes: vec![wgpu::CompositeAlphaMode::Opaque],
            usages: wgpu::TextureUsages::RENDER_ATTACHMENT,
        }
    }

    #[test]
    fn linear_format_is_preferred_by_default() {
        let c = caps(vec![
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Bgra8Unorm,
        ]);
        assert_eq!(choose_surface_format(&c, false), Some(wgpu::TextureFormat::Bgra8Unorm));
        assert_eq!(choose_surface_format(&c, true), Some(wgpu::TextureFormat::Bgra8UnormSrgb));
    }

    #[test]
    fn falls_back_to_first_format_and_supported_alpha() {
        let c = caps(vec![wgpu::TextureFormat::Rgb10a2Unorm]);
        assert_eq!(choose_surface_format(&c, false), Some(wgpu::TextureFormat::Rgb10a2Unorm));
        assert_eq!(choose_surface_format(&caps(vec![]), false), None);
        assert_eq!(
            choose_alpha_mode(&c, Some(wgpu::CompositeAlphaMode::PreMultiplied)),
            wgpu::CompositeAlphaMode::Opaque
        );
    }
}
