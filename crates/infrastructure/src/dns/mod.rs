pub mod answer;
pub mod framing;
pub mod upstream;

pub use answer::LocalAnswerTemplate;
pub use upstream::ProxyForwarder;
