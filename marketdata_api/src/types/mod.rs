mod chart;
pub use self::chart::{
    AdjCloseBlock, ChartEnvelope, ChartError, ChartNode, ChartResult, Indicators, MetaNode,
    QuoteBlock,
};
