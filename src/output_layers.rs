mod regression;
mod softmax;
mod svm;

pub use regression::Regression;
pub use softmax::Softmax;
pub use svm::Svm;
