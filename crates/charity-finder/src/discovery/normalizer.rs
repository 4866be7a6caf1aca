use super::domain::{BusinessStatus, Charity, CharityFlags, PhotoRef};
use super::geo::Coordinates;
use super::places::RawPlace;

/// A provider record that cannot become a [`Charity`]; the pipeline skips it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizationAnomaly {
    #[error("place record has no id")]
    MissingId,
    #[error("place {id} has no display name")]
    MissingName { id: String },
    #[error("place {id} has no location")]
    MissingLocation { id: String },
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Maps a raw provider record onto a [`Charity`] relative to the query point.
///
/// Flags are derived from the raw fields only; enrichment never touches them.
pub fn normalize(raw: RawPlace, query: &Coordinates) -> Result<Charity, NormalizationAnomaly> {
    let id = present(raw.id).ok_or(NormalizationAnomaly::MissingId)?;
    let name = present(raw.display_name.map(|name| name.text))
        .ok_or_else(|| NormalizationAnomaly::MissingName { id: id.clone() })?;
    let location = raw
        .location
        .ok_or_else(|| NormalizationAnomaly::MissingLocation { id: id.clone() })?;

    let link = present(raw.website_uri);
    let phone_number = present(raw.national_phone_number);
    let photos: Vec<PhotoRef> = raw
        .photos
        .unwrap_or_default()
        .into_iter()
        .filter(|photo| !photo.name.trim().is_empty())
        .map(|photo| PhotoRef {
            name: photo.name,
            width_px: photo.width_px,
            height_px: photo.height_px,
        })
        .collect();
    let rating = raw.rating.filter(|rating| rating.is_finite());

    let hours = raw.regular_opening_hours.or(raw.current_opening_hours);
    let (open_now, opening_hours) = match hours {
        Some(hours) => (hours.open_now, Some(hours.weekday_descriptions)),
        None => (None, None),
    };

    let flags = CharityFlags {
        no_website: link.is_none(),
        no_photos: photos.is_empty(),
        no_phone_number: phone_number.is_none(),
        no_opening_hours: opening_hours
            .as_ref()
            .map_or(true, |descriptions| descriptions.is_empty()),
        no_rating: rating.is_none(),
    };

    let distance_km = query.distance_to(&Coordinates {
        latitude: location.latitude,
        longitude: location.longitude,
    });

    Ok(Charity {
        id,
        name,
        address: raw.formatted_address.unwrap_or_default().trim().to_string(),
        link,
        maps_link: present(raw.google_maps_uri),
        phone_number,
        photos,
        rating,
        open_now,
        opening_hours,
        distance_km,
        description: String::new(),
        category: None,
        flags,
        business_status: BusinessStatus::from_provider(raw.business_status.as_deref()),
    })
}

/// Operational places reachable by website or phone make the cut.
pub fn is_eligible(charity: &Charity) -> bool {
    charity.business_status == BusinessStatus::Operational
        && (charity.link.is_some() || charity.phone_number.is_some())
}
