/// Error raised when a catalog cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("configuration catalog must contain at least one entry")]
    Empty,
}

/// One named GPU usage variant under comparison.
///
/// `P` carries the lesson specific binding parameters (texture format,
/// sampler filters, buffer binding, ...). Optional pass labels describe
/// alternating read paths that are measured in turn for the same entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration<P> {
    name: String,
    passes: Vec<String>,
    params: P,
}

impl<P> Configuration<P> {
    pub fn new(name: impl Into<String>, params: P) -> Self {
        Self {
            name: name.into(),
            passes: Vec::new(),
            params,
        }
    }

    /// Declares the passes measured alternately for this configuration.
    pub fn with_passes<I, S>(mut self, passes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.passes = passes.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &P {
        &self.params
    }

    pub fn passes(&self) -> &[String] {
        &self.passes
    }

    /// Number of measurement passes; a configuration always has at least one.
    pub fn pass_count(&self) -> usize {
        self.passes.len().max(1)
    }

    pub fn pass_label(&self, pass: usize) -> Option<&str> {
        self.passes.get(pass).map(String::as_str)
    }
}

/// Fixed, ordered list of configurations traversed circularly.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationCatalog<P> {
    entries: Vec<Configuration<P>>,
}

impl<P> ConfigurationCatalog<P> {
    pub fn new(entries: Vec<Configuration<P>>) -> Result<Self, CatalogError> {
        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(Self { entries })
    }

    /// Keeps only the configurations accepted by `keep`.
    ///
    /// Used at startup to drop variants the adapter cannot run. Fails when
    /// nothing survives.
    pub fn filter<F>(self, mut keep: F) -> Result<Self, CatalogError>
    where
        F: FnMut(&Configuration<P>) -> bool,
    {
        let entries: Vec<_> = self.entries.into_iter().filter(|entry| keep(entry)).collect();
        Self::new(entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configuration at `index`, taken modulo the catalog size.
    pub fn at(&self, index: usize) -> &Configuration<P> {
        &self.entries[index % self.entries.len()]
    }

    /// Index following `index`, wrapping back to the first entry.
    pub fn next(&self, index: usize) -> usize {
        (index + 1) % self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Configuration<P>> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(size: usize) -> ConfigurationCatalog<usize> {
        ConfigurationCatalog::new(
            (0..size)
                .map(|value| Configuration::new(format!("entry {value}"), value))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn empty_catalog_is_rejected() {
        let err = ConfigurationCatalog::<()>::new(Vec::new()).unwrap_err();
        assert_eq!(err, CatalogError::Empty);
    }

    #[test]
    fn next_is_a_cyclic_permutation() {
        for size in 1..=7 {
            let catalog = catalog(size);
            for start in 0..size {
                let mut index = start;
                for _ in 0..size {
                    index = catalog.next(index);
                    assert!(index < size);
                }
                assert_eq!(index, start, "size {size} start {start}");
            }
        }
    }

    #[test]
    fn at_looks_up_by_index() {
        let catalog = catalog(3);
        assert_eq!(catalog.at(0).name(), "entry 0");
        assert_eq!(*catalog.at(2).params(), 2);
        assert_eq!(catalog.at(4).name(), "entry 1");
    }

    #[test]
    fn filter_drops_entries_and_rejects_empty_result() {
        let filtered = catalog(4).filter(|entry| entry.params() % 2 == 0).unwrap();
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered.at(1).name(), "entry 2");

        let err = catalog(2).filter(|_| false).unwrap_err();
        assert_eq!(err, CatalogError::Empty);
    }

    #[test]
    fn passes_default_to_a_single_unnamed_pass() {
        let plain = Configuration::new("plain", ());
        assert_eq!(plain.pass_count(), 1);
        assert_eq!(plain.pass_label(0), None);

        let alternating = Configuration::new("alt", ()).with_passes(["texture()", "image"]);
        assert_eq!(alternating.pass_count(), 2);
        assert_eq!(alternating.pass_label(1), Some("image"));
    }
}
