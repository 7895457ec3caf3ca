use crate::errors::SinkError;
use crate::models::point::Point;
use crate::tariff::Utility;

/// Destination for priced points of one utility
pub trait PointSink {
    /// Writes all points of a utility. A sink sending in several requests may have
    /// committed earlier batches when a later one fails, the error is still returned.
    ///
    /// # Arguments
    ///
    /// * 'utility' - utility the points belong to
    /// * 'points' - the points to write
    fn write(&self, utility: Utility, points: &[Point]) -> Result<(), SinkError>;
}
