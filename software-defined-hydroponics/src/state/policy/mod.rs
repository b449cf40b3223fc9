pub mod nutrient;
