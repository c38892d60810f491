use phf::phf_map;

/// 测量工具类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolType {
    Length,
    Bidirectional,
    Angle,
    CobbAngle,
    EllipticalRoi,
    CircleRoi,
    RectangleRoi,
    ArrowAnnotate,
    Probe,
    PlanarFreehandRoi,
    SplineRoi,
    LivewireContour,
    /// 未识别的工具，按通用点集导出
    Unknown,
}

/// 工具名 → 工具类型（同时接受旧版和 cornerstone3D 的写法）
static TOOL_NAMES: phf::Map<&'static str, ToolType> = phf_map! {
    "Length" => ToolType::Length,
    "Bidirectional" => ToolType::Bidirectional,
    "Angle" => ToolType::Angle,
    "CobbAngle" => ToolType::CobbAngle,
    "EllipticalRoi" => ToolType::EllipticalRoi,
    "EllipticalROI" => ToolType::EllipticalRoi,
    "CircleRoi" => ToolType::CircleRoi,
    "CircleROI" => ToolType::CircleRoi,
    "RectangleRoi" => ToolType::RectangleRoi,
    "RectangleROI" => ToolType::RectangleRoi,
    "ArrowAnnotate" => ToolType::ArrowAnnotate,
    "Probe" => ToolType::Probe,
    "PlanarFreehandROI" => ToolType::PlanarFreehandRoi,
    "PlanarFreehandRoi" => ToolType::PlanarFreehandRoi,
    "SplineROI" => ToolType::SplineRoi,
    "SplineRoi" => ToolType::SplineRoi,
    "LivewireContour" => ToolType::LivewireContour,
};

impl ToolType {
    /// 从工具名解析，未知名称返回 `Unknown`
    pub fn from_name(name: &str) -> Self {
        TOOL_NAMES.get(name).copied().unwrap_or(ToolType::Unknown)
    }

    /// 标准名称
    pub fn name(self) -> &'static str {
        match self {
            ToolType::Length => "Length",
            ToolType::Bidirectional => "Bidirectional",
            ToolType::Angle => "Angle",
            ToolType::CobbAngle => "CobbAngle",
            ToolType::EllipticalRoi => "EllipticalRoi",
            ToolType::CircleRoi => "CircleRoi",
            ToolType::RectangleRoi => "RectangleRoi",
            ToolType::ArrowAnnotate => "ArrowAnnotate",
            ToolType::Probe => "Probe",
            ToolType::PlanarFreehandRoi => "PlanarFreehandROI",
            ToolType::SplineRoi => "SplineROI",
            ToolType::LivewireContour => "LivewireContour",
            ToolType::Unknown => "Unknown",
        }
    }

    /// 轮廓类工具（导出整条折线）
    pub fn is_contour(self) -> bool {
        matches!(
            self,
            ToolType::PlanarFreehandRoi | ToolType::SplineRoi | ToolType::LivewireContour
        )
    }

    /// 命名句柄的顺序，导入时按此顺序还原点
    pub fn handle_names(self) -> &'static [&'static str] {
        match self {
            ToolType::Length | ToolType::ArrowAnnotate | ToolType::CircleRoi => &["start", "end"],
            ToolType::EllipticalRoi | ToolType::RectangleRoi => &["start", "end"],
            ToolType::Bidirectional | ToolType::CobbAngle => &["start", "end", "start2", "end2"],
            ToolType::Angle => &["start", "middle", "end"],
            ToolType::Probe => &["start"],
            _ => &[],
        }
    }
}

impl std::fmt::Display for ToolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_and_cornerstone3d_names() {
        assert_eq!(ToolType::from_name("EllipticalRoi"), ToolType::EllipticalRoi);
        assert_eq!(ToolType::from_name("EllipticalROI"), ToolType::EllipticalRoi);
        assert_eq!(ToolType::from_name("RectangleROI"), ToolType::RectangleRoi);
        assert_eq!(ToolType::from_name("PlanarFreehandROI"), ToolType::PlanarFreehandRoi);
    }

    #[test]
    fn test_unknown_name() {
        assert_eq!(ToolType::from_name("UltrasoundDirectional"), ToolType::Unknown);
        assert_eq!(ToolType::from_name(""), ToolType::Unknown);
    }

    #[test]
    fn test_contour_tools() {
        assert!(ToolType::SplineRoi.is_contour());
        assert!(ToolType::LivewireContour.is_contour());
        assert!(!ToolType::Length.is_contour());
    }
}
