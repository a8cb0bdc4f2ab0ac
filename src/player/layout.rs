use crate::player::surface::Dimensions;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub max_width: f64,
    pub max_height: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FittedSize {
    pub width: f64,
    pub height: f64,
}

/// Largest size with the media's aspect ratio that fits inside `bounds`.
pub fn fit_within(native: Dimensions, bounds: Bounds) -> Option<FittedSize> {
    if native.width == 0 || native.height == 0 || bounds.max_width <= 0.0 || bounds.max_height <= 0.0 {
        return None;
    }

    let width = f64::from(native.width);
    let height = f64::from(native.height);
    let scale = (bounds.max_width / width).min(bounds.max_height / height);

    Some(FittedSize {
        width: (width * scale).round(),
        height: (height * scale).round(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VISUAL_AREA: Bounds = Bounds {
        max_width: 600.0,
        max_height: 400.0,
    };

    #[test]
    fn wide_video_is_limited_by_width() {
        let fitted = fit_within(
            Dimensions {
                width: 1920,
                height: 1080,
            },
            VISUAL_AREA,
        )
        .expect("fits");

        assert_eq!(fitted, FittedSize { width: 600.0, height: 338.0 });
    }

    #[test]
    fn tall_image_is_limited_by_height() {
        let fitted = fit_within(
            Dimensions {
                width: 1080,
                height: 1920,
            },
            VISUAL_AREA,
        )
        .expect("fits");

        assert_eq!(fitted, FittedSize { width: 225.0, height: 400.0 });
    }

    #[test]
    fn small_media_scales_up_to_the_bounds() {
        let fitted = fit_within(
            Dimensions {
                width: 300,
                height: 200,
            },
            VISUAL_AREA,
        )
        .expect("fits");

        assert_eq!(fitted, FittedSize { width: 600.0, height: 400.0 });
    }

    #[test]
    fn degenerate_inputs_do_not_fit() {
        assert_eq!(
            fit_within(Dimensions { width: 0, height: 10 }, VISUAL_AREA),
            None
        );
        assert_eq!(
            fit_within(
                Dimensions {
                    width: 10,
                    height: 10
                },
                Bounds {
                    max_width: 0.0,
                    max_height: 400.0
                }
            ),
            None
        );
    }
}
