//! Plot objects: one per chart group in a chart's plot area.

use crate::error::{PptxError, Result};
use crate::oxml::XmlElement;
use quick_xml::Reader;
use quick_xml::events::Event;

/// The kind of a chart group, tagged by its element name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotKind {
    Area,
    Bar,
    Doughnut,
    Line,
    Pie,
    Radar,
    Scatter,
    /// A chart group this model has no dedicated kind for
    Other,
}

impl PlotKind {
    /// Map a chart-group element's local name to its kind.
    fn from_element_name(name: &str) -> Self {
        match name {
            "areaChart" | "area3DChart" => PlotKind::Area,
            "barChart" | "bar3DChart" => PlotKind::Bar,
            "doughnutChart" => PlotKind::Doughnut,
            "lineChart" | "line3DChart" => PlotKind::Line,
            "pieChart" | "pie3DChart" => PlotKind::Pie,
            "radarChart" => PlotKind::Radar,
            "scatterChart" => PlotKind::Scatter,
            _ => PlotKind::Other,
        }
    }
}

/// A distinct plot appearing in the plot area of a chart.
///
/// A chart may have more than one plot, in which case they appear as
/// superimposed layers, such as a line plot on top of a bar chart.
pub struct Plot {
    /// The chart-group element (e.g., `c:barChart`)
    element: XmlElement,

    /// Kind tag derived from the element name
    kind: PlotKind,
}

impl Plot {
    /// Wrap a chart-group element.
    pub fn from_element(element: XmlElement) -> Result<Self> {
        let kind = element
            .root_local_name()
            .map_err(PptxError::from)?
            .map(|name| PlotKind::from_element_name(&name))
            .unwrap_or(PlotKind::Other);
        Ok(Self { element, kind })
    }

    /// Get the kind of this plot.
    pub fn kind(&self) -> PlotKind {
        self.kind
    }

    /// Check whether this plot has a data labels element.
    pub fn has_data_labels(&self) -> Result<bool> {
        Ok(self.element.has_element("dLbls")?)
    }

    /// The data label settings for this plot.
    ///
    /// A plot that has no `dLbls` element has no data labels to describe;
    /// asking for them is a precondition violation, surfaced directly rather
    /// than recovered.
    pub fn data_labels(&self) -> Result<DataLabels> {
        if !self.has_data_labels()? {
            return Err(PptxError::InvalidState(
                "plot has no data labels; enable them before accessing".to_string(),
            ));
        }
        DataLabels::from_plot_element(&self.element)
    }
}

/// Data label settings for the collection of labels attached to a plot.
#[derive(Debug, Clone, Default)]
pub struct DataLabels {
    /// Label position code (e.g., "ctr", "outEnd"), if declared
    pub position: Option<String>,
    /// Show the legend key in labels
    pub show_legend_key: bool,
    /// Show the value
    pub show_value: bool,
    /// Show the category name
    pub show_category_name: bool,
    /// Show the series name
    pub show_series_name: bool,
    /// Show the percentage (pie/doughnut)
    pub show_percent: bool,
    /// Separator between label components, if declared
    pub separator: Option<String>,
}

impl DataLabels {
    /// Parse the plot-level `dLbls` element of a chart-group element.
    ///
    /// Series carry their own `dLbls`; only the one that is a direct child
    /// of the chart-group element describes the plot, so nesting depth is
    /// tracked and deeper occurrences are ignored.
    fn from_plot_element(element: &XmlElement) -> Result<Self> {
        let mut labels = DataLabels::default();

        let mut reader = Reader::from_reader(element.serialize());
        reader.config_mut().trim_text(true);

        let mut depth = 0usize;
        let mut in_dlbls = false;
        let mut in_separator = false;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    if depth == 1 && e.local_name().as_ref() == b"dLbls" {
                        in_dlbls = true;
                    } else if in_dlbls {
                        Self::apply_child(&mut labels, e, &mut in_separator)?;
                    }
                    depth += 1;
                }
                Ok(Event::Empty(ref e)) => {
                    if in_dlbls {
                        Self::apply_child(&mut labels, e, &mut in_separator)?;
                    }
                }
                Ok(Event::Text(ref e)) if in_separator => {
                    let text = std::str::from_utf8(e.as_ref())
                        .map_err(|e| PptxError::Xml(e.to_string()))?;
                    labels.separator = Some(text.to_string());
                }
                Ok(Event::End(ref e)) => {
                    depth = depth.saturating_sub(1);
                    match e.local_name().as_ref() {
                        b"separator" => in_separator = false,
                        b"dLbls" if in_dlbls && depth == 1 => break,
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(PptxError::Xml(format!("XML parse error: {}", e))),
                _ => {}
            }
        }

        Ok(labels)
    }

    /// Apply one `dLbls` child element to the settings under construction.
    fn apply_child(
        labels: &mut DataLabels,
        e: &quick_xml::events::BytesStart<'_>,
        in_separator: &mut bool,
    ) -> Result<()> {
        let val_attr = || -> Result<Option<String>> {
            for attr in e.attributes() {
                let attr = attr.map_err(|e| PptxError::Xml(e.to_string()))?;
                if attr.key.as_ref() == b"val" {
                    let v = attr
                        .unescape_value()
                        .map_err(|e| PptxError::Xml(e.to_string()))?;
                    return Ok(Some(v.to_string()));
                }
            }
            Ok(None)
        };
        // a boolean attribute omitted means enabled
        let flag = |v: Option<String>| v.map(|v| v == "1" || v == "true").unwrap_or(true);

        match e.local_name().as_ref() {
            b"showLegendKey" => labels.show_legend_key = flag(val_attr()?),
            b"showVal" => labels.show_value = flag(val_attr()?),
            b"showCatName" => labels.show_category_name = flag(val_attr()?),
            b"showSerName" => labels.show_series_name = flag(val_attr()?),
            b"showPercent" => labels.show_percent = flag(val_attr()?),
            b"dLblPos" => labels.position = val_attr()?,
            b"separator" => *in_separator = true,
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plot(xml: &[u8]) -> Plot {
        Plot::from_element(XmlElement::parse(xml.to_vec()).unwrap()).unwrap()
    }

    const BAR_WITH_LABELS: &[u8] = br#"<c:barChart xmlns:c="http://schemas.openxmlformats.org/drawingml/2006/chart">
  <c:dLbls>
    <c:dLblPos val="outEnd"/>
    <c:showLegendKey val="0"/>
    <c:showVal val="1"/>
    <c:showCatName val="0"/>
    <c:showSerName val="0"/>
    <c:showPercent val="0"/>
  </c:dLbls>
</c:barChart>"#;

    #[test]
    fn test_plot_kind_from_element_name() {
        assert_eq!(plot(BAR_WITH_LABELS).kind(), PlotKind::Bar);
        assert_eq!(
            plot(br#"<c:pieChart xmlns:c="http://schemas.openxmlformats.org/drawingml/2006/chart"/>"#).kind(),
            PlotKind::Pie
        );
        assert_eq!(
            plot(br#"<c:surfaceChart xmlns:c="http://schemas.openxmlformats.org/drawingml/2006/chart"/>"#).kind(),
            PlotKind::Other
        );
    }

    #[test]
    fn test_data_labels_parsed() {
        let plot = plot(BAR_WITH_LABELS);
        assert!(plot.has_data_labels().unwrap());

        let labels = plot.data_labels().unwrap();
        assert_eq!(labels.position.as_deref(), Some("outEnd"));
        assert!(labels.show_value);
        assert!(!labels.show_category_name);
        assert!(!labels.show_legend_key);
    }

    #[test]
    fn test_data_labels_requires_dlbls_element() {
        let plot = plot(
            br#"<c:lineChart xmlns:c="http://schemas.openxmlformats.org/drawingml/2006/chart"/>"#,
        );
        assert!(!plot.has_data_labels().unwrap());
        assert!(matches!(
            plot.data_labels().unwrap_err(),
            PptxError::InvalidState(_)
        ));
    }
}
