//! Random CommerceML catalog generator.
//!
//! Produces the three exchange documents with random but consistent
//! content:
//!
//! - `import.xml`: classifier (category tree, units of measure) and catalog
//! - `offers.xml`: one price per product
//! - `rests.xml`: stock level per product
//!
//! Products reference leaf categories, units and image assets that exist,
//! and offers/rests reference the product ids minted for the catalog. All
//! randomness comes from the caller's RNG.

mod words;
mod xml;

use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

pub use words::{inflect, Dictionaries, Gender};
pub use xml::{escape, XmlElement};

use crate::config::{GeneratorConfig, PathsConfig};
use crate::error::{ExchangeError, Result};
use crate::package::{is_image_name, DocumentKind};
use crate::protocol::SCHEMA_VERSION;

const CATALOG_NAME: &str = "Каталог товаров";
const FIRST_UNIT_ID: u32 = 750;

/// Counts of generated entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GenerationSummary {
    /// Leaf categories products are assigned to
    pub categories: usize,
    /// Products in the catalog
    pub products: usize,
    /// Units of measure
    pub units: usize,
}

/// Rendered documents
#[derive(Debug, Clone)]
pub struct GeneratedCatalog {
    /// `import.xml`
    pub import: String,
    /// `offers.xml`
    pub offers: String,
    /// `rests.xml`
    pub rests: String,
    /// Entity counts
    pub summary: GenerationSummary,
}

impl GeneratedCatalog {
    /// Document text for `kind`
    pub fn document(&self, kind: DocumentKind) -> &str {
        match kind {
            DocumentKind::Import => &self.import,
            DocumentKind::Offers => &self.offers,
            DocumentKind::Rests => &self.rests,
        }
    }
}

#[derive(Debug, Clone)]
struct Unit {
    id: u32,
    name: String,
    short: String,
}

/// Catalog generator
#[derive(Debug, Clone)]
pub struct CatalogGenerator {
    config: GeneratorConfig,
    dictionaries: Dictionaries,
    images: Vec<String>,
}

impl CatalogGenerator {
    /// Create a generator with explicit word lists and image names
    pub fn new(config: GeneratorConfig, dictionaries: Dictionaries, images: Vec<String>) -> Self {
        Self {
            config,
            dictionaries,
            images,
        }
    }

    /// Create a generator reading word lists and image names from `paths`
    pub fn from_paths(config: GeneratorConfig, paths: &PathsConfig) -> Result<Self> {
        let dictionaries = Dictionaries::load(&paths.dictionaries_dir)?;
        let images = list_images(&paths.images_dir)?;
        Ok(Self::new(config, dictionaries, images))
    }

    /// Build the three documents in memory
    pub fn build<R: Rng>(&self, rng: &mut R) -> Result<GeneratedCatalog> {
        let mut run = Run {
            generator: self,
            rng,
            leaf_groups: Vec::new(),
            units: Vec::new(),
            products: Vec::new(),
        };
        run.build()
    }

    /// Build the documents and write them to `out_dir`
    pub fn generate<R: Rng>(&self, rng: &mut R, out_dir: &Path) -> Result<GenerationSummary> {
        let catalog = self.build(rng)?;

        std::fs::create_dir_all(out_dir).map_err(|e| {
            ExchangeError::Generator(format!("Failed to create {}: {e}", out_dir.display()))
        })?;
        for kind in DocumentKind::ALL {
            let path = out_dir.join(kind.xml_name());
            std::fs::write(&path, catalog.document(kind)).map_err(|e| {
                ExchangeError::Generator(format!("Failed to write {}: {e}", path.display()))
            })?;
            tracing::info!("Generated {}", path.display());
        }

        Ok(catalog.summary)
    }
}

/// State of one generation pass
struct Run<'a, R: Rng> {
    generator: &'a CatalogGenerator,
    rng: &'a mut R,
    leaf_groups: Vec<String>,
    units: Vec<Unit>,
    products: Vec<String>,
}

impl<R: Rng> Run<'_, R> {
    fn build(&mut self) -> Result<GeneratedCatalog> {
        let generator = self.generator;
        let config = &generator.config;
        let catalog_id = self.guid();
        let classifier_id = self.guid();

        let fanout = if config.categories_level == 0 {
            0.0
        } else {
            f64::from(config.categories_count).powf(1.0 / f64::from(config.categories_level))
        };
        let groups = self.groups(fanout, config.categories_level);
        let units = self.units(config.units_count);

        if config.products_count > 0 && (self.leaf_groups.is_empty() || self.units.is_empty()) {
            return Err(ExchangeError::Generator(
                "products need at least one leaf category and one unit".to_string(),
            ));
        }

        let products: Vec<XmlElement> =
            (0..config.products_count).map(|_| self.product()).collect();

        let import = root()
            .child(
                XmlElement::new("Классификатор")
                    .attr("СодержитТолькоИзменения", "true")
                    .field("Ид", &classifier_id)
                    .field("Наименование", CATALOG_NAME)
                    .child(XmlElement::new("Группы").children(groups))
                    .child(XmlElement::new("ЕдиницыИзмерения").children(units)),
            )
            .child(
                XmlElement::new("Каталог")
                    .attr("СодержитТолькоИзменения", "true")
                    .field("Ид", &catalog_id)
                    .field("ИдКлассификатора", &classifier_id)
                    .field("Наименование", CATALOG_NAME)
                    .field("Описание", CATALOG_NAME)
                    .child(XmlElement::new("Товары").children(products)),
            );

        let offers = self.offers(&catalog_id, &classifier_id);
        let rests = self.rests(&catalog_id, &classifier_id);

        Ok(GeneratedCatalog {
            import: import.to_document(),
            offers: offers.to_document(),
            rests: rests.to_document(),
            summary: GenerationSummary {
                categories: self.leaf_groups.len(),
                products: self.products.len(),
                units: self.units.len(),
            },
        })
    }

    fn guid(&mut self) -> String {
        uuid::Builder::from_random_bytes(self.rng.gen())
            .into_uuid()
            .to_string()
    }

    /// Category tree: about `fanout` groups per level, ±20 %
    fn groups(&mut self, fanout: f64, level: u32) -> Vec<XmlElement> {
        if level == 0 {
            return Vec::new();
        }

        let count = (fanout * self.rng.gen_range(0.8..=1.2)).round() as usize;
        (0..count)
            .map(|_| {
                let id = self.guid();
                if level == 1 {
                    self.leaf_groups.push(id.clone());
                }
                let name = self.generator.dictionaries.random_phrase(&mut *self.rng);

                let group = XmlElement::new("Группа")
                    .field("Ид", id)
                    .field("ПометкаУдаления", "false")
                    .field("Наименование", name)
                    .field("Описание", "")
                    .field("БитриксСортировка", "999999");
                if level > 1 {
                    group.child(XmlElement::new("Группы").children(self.groups(fanout, level - 1)))
                } else {
                    group
                }
            })
            .collect()
    }

    fn units(&mut self, count: u32) -> Vec<XmlElement> {
        (0..count)
            .rev()
            .map(|i| {
                let id = FIRST_UNIT_ID + i;
                let name = self.generator.dictionaries.phrase(&mut *self.rng, "b");
                let len = self.rng.gen_range(2..=5);
                let short = name.chars().take(len).collect::<String>().trim().to_lowercase();

                self.units.push(Unit {
                    id,
                    name: name.clone(),
                    short: short.clone(),
                });
                XmlElement::new("ЕдиницаИзмерения")
                    .field("Ид", id)
                    .field("Код", id)
                    .field("ПометкаУдаления", "false")
                    .field("НаименованиеПолное", name)
                    .field("НаименованиеКраткое", short)
            })
            .collect()
    }

    fn product(&mut self) -> XmlElement {
        let id = self.guid();
        self.products.push(id.clone());

        let unit = self.units.choose(&mut *self.rng).cloned();
        let group = self.leaf_groups.choose(&mut *self.rng).cloned().unwrap_or_default();
        let name = self.generator.dictionaries.random_phrase(&mut *self.rng);
        let weight = f64::from(self.rng.gen_range(50u32..=1850)) / 100.0;

        let mut product = XmlElement::new("Товар")
            .field("Ид", id)
            .field("ПометкаУдаления", "false")
            .field("Наименование", name)
            .field("Описание", "")
            .child(XmlElement::new("Группы").field("Ид", group));

        if let Some(unit) = unit {
            product = product.child(
                XmlElement::leaf("БазоваяЕдиница", unit.id)
                    .attr("Код", unit.id)
                    .attr("НаименованиеПолное", unit.name)
                    .attr("НаименованиеКраткое", unit.short),
            );
        }

        product = product
            .child(XmlElement::new("ЗначенияСвойств"))
            .child(XmlElement::new("СтавкиНалогов"))
            .field("Вес", weight)
            .child(
                XmlElement::new("ЗначенияРеквизитов")
                    .child(requisite("ВидНоменклатуры", "Товар"))
                    .child(requisite("ТипНоменклатуры", "Товар")),
            );

        if !self.generator.images.is_empty() {
            for _ in 0..self.rng.gen_range(0..=3) {
                if let Some(image) = self.generator.images.choose(&mut *self.rng) {
                    product = product.field("Картинка", image);
                }
            }
        }

        product
    }

    fn offers(&mut self, catalog_id: &str, classifier_id: &str) -> XmlElement {
        let package = self.package("Торговые предложения", catalog_id, classifier_id);
        let products = self.products.clone();

        let offers = products.into_iter().map(|id| {
            let base: f64 = 0.1 + self.rng.gen::<f64>() * 100.0;
            let scale = 10f64.powi(self.rng.gen_range(1..=2) * 2);
            let price = (base * scale * 100.0).round() / 100.0;

            XmlElement::new("Предложение").field("Ид", id).child(
                XmlElement::new("Цены").child(
                    XmlElement::new("Цена")
                        .field(
                            "Представление",
                            format!("{} руб. за ед.", price.to_string().replace('.', ",")),
                        )
                        .field("ИдТипаЦены", "BASE")
                        .field("ЦенаЗаЕдиницу", price)
                        .field("Валюта", "руб"),
                ),
            )
        });

        root().child(package.child(XmlElement::new("Предложения").children(offers.collect::<Vec<_>>())))
    }

    fn rests(&mut self, catalog_id: &str, classifier_id: &str) -> XmlElement {
        let package = self.package("Складские остатки", catalog_id, classifier_id);
        let products = self.products.clone();

        let rests: Vec<XmlElement> = products
            .into_iter()
            .map(|id| {
                XmlElement::new("Предложение")
                    .field("Ид", id)
                    .child(XmlElement::new("Остатки").field("Остаток", self.rng.gen_range(1u32..=80)))
            })
            .collect();

        root().child(package.child(XmlElement::new("Предложения").children(rests)))
    }

    fn package(&mut self, name: &str, catalog_id: &str, classifier_id: &str) -> XmlElement {
        XmlElement::new("ПакетПредложений")
            .attr("СодержитТолькоИзменения", "true")
            .field("Ид", self.guid())
            .field("Наименование", name)
            .field("ИдКаталога", catalog_id)
            .field("ИдКлассификатора", classifier_id)
    }
}

fn root() -> XmlElement {
    XmlElement::new("КоммерческаяИнформация")
        .attr("xmlns", "urn:1C.ru:commerceml_2")
        .attr("xmlns:xs", "http://www.w3.org/2001/XMLSchema")
        .attr("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance")
        .attr("ВерсияСхемы", SCHEMA_VERSION)
        .attr(
            "ДатаФормирования",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
        )
}

fn requisite(name: &str, value: &str) -> XmlElement {
    XmlElement::new("ЗначениеРеквизита")
        .field("Наименование", name)
        .field("Значение", value)
}

/// `*.jpg` file names in `dir`, sorted; empty when the directory is missing
fn list_images(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        tracing::warn!("No image directory at {}, products get no pictures", dir.display());
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(dir)
        .map_err(|e| ExchangeError::Generator(format!("Failed to read {}: {e}", dir.display())))?;
    let mut images: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| PathBuf::from(entry.file_name()))
        .filter_map(|name| name.to_str().map(String::from))
        .filter(|name| is_image_name(name))
        .collect();
    images.sort();
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::scan_image_refs;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn small_config() -> GeneratorConfig {
        GeneratorConfig {
            categories_count: 8,
            categories_level: 2,
            products_count: 25,
            units_count: 4,
        }
    }

    fn generator(images: &[&str]) -> CatalogGenerator {
        CatalogGenerator::new(
            small_config(),
            Dictionaries::default(),
            images.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_summary_counts() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let catalog = generator(&[]).build(&mut rng).unwrap();

        assert_eq!(catalog.summary.products, 25);
        assert_eq!(catalog.summary.units, 4);
        assert!(catalog.summary.categories > 0);
        assert_eq!(catalog.import.matches("<Товар>").count(), 25);
        assert_eq!(catalog.offers.matches("<Предложение>").count(), 25);
        assert_eq!(catalog.rests.matches("<Остаток>").count(), 25);
        assert!(catalog.import.contains("<Ид>750</Ид>"));
        assert!(catalog.import.contains("<Ид>753</Ид>"));
    }

    #[test]
    fn test_ids_consistent_across_documents() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let catalog = generator(&[]).build(&mut rng).unwrap();

        let first_offer = catalog
            .offers
            .split("<Предложение>")
            .nth(1)
            .and_then(|s| s.split("<Ид>").nth(1))
            .and_then(|s| s.split("</Ид>").next())
            .unwrap();
        assert!(uuid::Uuid::parse_str(first_offer).is_ok());
        assert!(catalog.import.contains(first_offer));
        assert!(catalog.rests.contains(first_offer));
    }

    #[test]
    fn test_images_reference_known_assets() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let catalog = generator(&["1.jpg", "2.jpg"]).build(&mut rng).unwrap();

        let refs = scan_image_refs(catalog.import.as_bytes());
        assert!(!refs.is_empty());
        assert!(refs.iter().all(|r| r == "1.jpg" || r == "2.jpg"));
    }

    #[test]
    fn test_deterministic_under_seed() {
        let builder = generator(&["1.jpg"]);
        let a = builder.build(&mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        let b = builder.build(&mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        assert_eq!(a.summary, b.summary);
        assert_eq!(a.rests, b.rests);
    }

    #[test]
    fn test_no_categories_rejected() {
        let mut config = small_config();
        config.categories_count = 0;
        let builder = CatalogGenerator::new(config, Dictionaries::default(), Vec::new());
        let err = builder.build(&mut ChaCha8Rng::seed_from_u64(1)).unwrap_err();
        assert!(matches!(err, ExchangeError::Generator(_)));
    }

    #[test]
    fn test_generate_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathsConfig {
            templates_dir: dir.path().join("templates"),
            images_dir: dir.path().join("templates/images"),
            staging_dir: dir.path().join("temp"),
            dictionaries_dir: dir.path().join("templates"),
        };
        std::fs::create_dir_all(&paths.images_dir).unwrap();
        std::fs::write(paths.images_dir.join("7.jpg"), b"jpg").unwrap();
        std::fs::write(paths.images_dir.join("notes.txt"), b"x").unwrap();

        let builder = CatalogGenerator::from_paths(small_config(), &paths).unwrap();
        assert_eq!(builder.images, vec!["7.jpg"]);

        let summary = builder
            .generate(&mut ChaCha8Rng::seed_from_u64(2), &paths.templates_dir)
            .unwrap();
        assert_eq!(summary.products, 25);
        for kind in DocumentKind::ALL {
            let text = std::fs::read_to_string(paths.templates_dir.join(kind.xml_name())).unwrap();
            assert!(text.contains("ВерсияСхемы=\"2.08\""));
        }
    }
}
