use anyhow::Result;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use study_core::filter::Favorites;
use study_core::rating::{color_for, rating_label};
use study_core::schema::{StoredLocation, WEEKDAYS};

pub struct VaultPaths {
    pub root: PathBuf,
    pub index_dir: PathBuf,
    pub locations_dir: PathBuf,
}

impl VaultPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            index_dir: root.join("00_Index"),
            locations_dir: root.join("Locations"),
            root,
        }
    }

    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.index_dir)?;
        fs::create_dir_all(&self.locations_dir)?;
        Ok(())
    }
}

/// Write one note per location plus index notes under `vault_root`.
pub fn build_guide(
    records: &[StoredLocation],
    favorites: &Favorites,
    vault_root: &Path,
) -> Result<()> {
    let paths = VaultPaths::new(vault_root);
    paths.ensure()?;

    let mut ordered: Vec<&StoredLocation> = records.iter().collect();
    ordered.sort_by(|a, b| {
        b.location
            .rating
            .total_cmp(&a.location.rating)
            .then_with(|| a.location.name.cmp(&b.location.name))
    });

    // 1) Location notes and the main index
    let mut index_lines = header("MOC - Locations");
    let mut category_counts: BTreeMap<String, usize> = BTreeMap::new();

    for record in &ordered {
        write_location_note(&paths, record, favorites.contains(&record.id))?;
        index_lines.push(format!(
            "- [[Locations/{}|{}]] ({})",
            record.id,
            record.location.name,
            rating_label(record.location.rating)
        ));
        *category_counts
            .entry(category_heading(record))
            .or_insert(0) += 1;
    }
    if ordered.is_empty() {
        index_lines.push("_No study locations found._".to_string());
    }
    fs::write(
        paths.index_dir.join("MOC - Locations.md"),
        index_lines.join("\n"),
    )?;

    // 2) Favorites
    let mut favorite_lines = header("MOC - Favorites");
    let favorite_links: Vec<String> = ordered
        .iter()
        .filter(|record| favorites.contains(&record.id))
        .map(|record| format!("- [[Locations/{}|{}]]", record.id, record.location.name))
        .collect();
    if favorite_links.is_empty() {
        favorite_lines.push("_No favorites yet._".to_string());
    } else {
        favorite_lines.extend(favorite_links);
    }
    fs::write(
        paths.index_dir.join("MOC - Favorites.md"),
        favorite_lines.join("\n"),
    )?;

    // 3) Categories
    let mut category_lines = header("MOC - Categories");
    let mut counts: Vec<(String, usize)> = category_counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    if counts.is_empty() {
        category_lines.push("_No categories found._".to_string());
    } else {
        for (category, count) in counts {
            category_lines.push(format!("- {category} ({count})"));
        }
    }
    fs::write(
        paths.index_dir.join("MOC - Categories.md"),
        category_lines.join("\n"),
    )?;

    tracing::info!(
        locations = ordered.len(),
        root = %paths.root.display(),
        "guide written"
    );
    Ok(())
}

fn header(title: &str) -> Vec<String> {
    vec![
        format!("# {title}"),
        String::new(),
        "This index is generated. Do not edit manually.".to_string(),
        String::new(),
    ]
}

fn category_heading(record: &StoredLocation) -> String {
    let category = record.location.category.as_str();
    if category.is_empty() {
        "uncategorized".to_string()
    } else {
        category.to_string()
    }
}

fn write_location_note(paths: &VaultPaths, record: &StoredLocation, favorite: bool) -> Result<()> {
    let note_path = paths.locations_dir.join(format!("{}.md", record.id));
    fs::write(note_path, render_location_note(record, favorite))?;
    Ok(())
}

pub fn render_location_note(record: &StoredLocation, favorite: bool) -> String {
    let l = &record.location;
    let color = color_for(l.rating);

    let mut md = String::new();
    md.push_str("---\n");
    md.push_str(&format!("id: {}\n", record.id));
    md.push_str(&format!("category: {}\n", category_heading(record)));
    md.push_str(&format!("rating: {}\n", rating_label(l.rating)));
    md.push_str(&format!("marker_color: \"{}\"\n", color.hex()));
    md.push_str(&format!("marker_symbol: {}\n", l.category.marker_symbol()));
    md.push_str(&format!("latitude: {}\n", l.latitude));
    md.push_str(&format!("longitude: {}\n", l.longitude));
    md.push_str(&format!("favorite: {favorite}\n"));
    md.push_str("---\n\n");

    md.push_str(&format!("# {}\n\n", l.name));
    if !l.title.is_empty() {
        md.push_str(&format!("{}\n\n", l.title));
    }
    md.push_str(&format!("Rating: {}\n\n", rating_label(l.rating)));

    // Same chips the list row shows; both values are needed.
    if let (Some(crowdedness), Some(noise)) =
        (l.env_factors.crowdedness(), l.env_factors.noise())
    {
        md.push_str(&format!(
            "`Crowdedness: {}` `Noise: {}`\n\n",
            rating_label(crowdedness),
            rating_label(noise)
        ));
    }

    md.push_str("## Opening Hours\n");
    for day in WEEKDAYS {
        match l.hours_on(day) {
            Some(hours) if hours.is_closed() => md.push_str(&format!("- {day}: Closed\n")),
            Some(hours) => md.push_str(&format!("- {day}: {} - {}\n", hours.open, hours.close)),
            None => md.push_str(&format!("- {day}: unknown\n")),
        }
    }
    md.push('\n');

    md.push_str("## Amenities\n");
    if l.env_factors.static_data.is_empty() {
        md.push_str("_No amenity data._\n");
    } else {
        for (label, value) in &l.env_factors.static_data {
            md.push_str(&format!("- {label}: {value}\n"));
        }
    }
    if !l.env_factors.atmosphere.is_empty() {
        md.push_str(&format!("- Atmosphere: {}\n", l.env_factors.atmosphere.join(", ")));
    }
    md.push('\n');

    md.push_str("## Comments\n");
    if l.comments.is_empty() {
        md.push_str("_No comments yet._\n");
    } else {
        for comment in &l.comments {
            match comment.date {
                Some(date) => md.push_str(&format!(
                    "- **{}** ({}): {}\n",
                    comment.name,
                    date.date(),
                    comment.content
                )),
                None => md.push_str(&format!("- **{}**: {}\n", comment.name, comment.content)),
            }
        }
    }

    md
}
