pub mod serialized_data;
