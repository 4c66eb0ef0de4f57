mod machine;
mod validator;

pub use machine::{
    DataType, DataTypeValue, Destination, SelectionEvent, SelectionMachine, SelectionPath,
    SelectionState, OTHER_DATA_TYPE,
};
pub use validator::{
    is_valid_data_type_other, is_valid_session_label, is_valid_subject_label, LabelError,
    LabelField,
};
